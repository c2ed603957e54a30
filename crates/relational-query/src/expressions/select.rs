//! `SELECT` and the table sources, projections and orderings it is made of.

use super::SqlExpr;

/// A `SELECT` statement or subquery.
#[derive(Debug, Clone, Default, PartialEq, Hash)]
pub struct SelectExpression {
    /// Alias when used as a derived table.
    pub alias: Option<String>,
    pub is_distinct: bool,
    /// [`ProjectionExpression`] nodes (or a `*` fragment).
    pub projection: Vec<SqlExpr>,
    /// [`TableExpression`] / [`FromSqlExpression`] nodes.
    pub tables: Vec<SqlExpr>,
    pub predicate: Option<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub having: Option<SqlExpr>,
    /// [`OrderingExpression`] nodes.
    pub orderings: Vec<SqlExpr>,
    pub limit: Option<SqlExpr>,
    pub offset: Option<SqlExpr>,
}

impl SelectExpression {
    /// `SELECT` from a single table source.
    pub fn from_table(table: SqlExpr) -> Self {
        Self {
            tables: vec![table],
            ..Self::default()
        }
    }

    pub fn is_paged(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

/// Named table in a `FROM` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableExpression {
    pub name: String,
    pub schema: Option<String>,
    pub alias: String,
}

/// Raw SQL used as a derived table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromSqlExpression {
    pub sql: String,
    pub argument: SqlExpr,
    pub alias: String,
}

/// One projected column: `expression AS alias`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionExpression {
    pub expression: SqlExpr,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderingExpression {
    pub expression: SqlExpr,
    pub ascending: bool,
}
