use super::SqlExpr;

/// Shape of a grouping result: key, element, and the subquery producing the
/// elements of each group.
///
/// The three parts are correlated through the grouping subquery, so the
/// generic child rewrite refuses this node (see
/// [`SqlExpr::visit_children`]).
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct RelationalGroupByShaperExpression {
    pub key_selector: SqlExpr,
    pub element_selector: SqlExpr,
    /// `SELECT` yielding the elements of one group.
    pub grouping_enumerable: SqlExpr,
}

impl RelationalGroupByShaperExpression {
    pub fn new(key_selector: SqlExpr, element_selector: SqlExpr, grouping_enumerable: SqlExpr) -> Self {
        Self {
            key_selector,
            element_selector,
            grouping_enumerable,
        }
    }
}
