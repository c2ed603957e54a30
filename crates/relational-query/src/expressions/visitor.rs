//! Tree rewriting.
//!
//! A visitor decides what to do with each node it is handed. To recurse it
//! calls [`SqlExpr::visit_children`], which rebuilds the node only when at
//! least one child came back as a different handle.

use crate::error::{QueryError, Result};

use super::{
    CaseExpression, CaseWhenClause, ExpressionKind, FromSqlExpression, FunctionArguments,
    LikeExpression, OrderingExpression, ProjectionExpression, SelectExpression,
    SqlBinaryExpression, SqlExpr, SqlUnaryExpression,
};

/// Rewrites expression nodes.
pub trait ExpressionVisitor {
    fn visit(&mut self, expression: &SqlExpr) -> Result<SqlExpr>;
}

/// Returns every node unchanged.
#[derive(Debug, Default)]
pub struct IdentityVisitor;

impl ExpressionVisitor for IdentityVisitor {
    fn visit(&mut self, expression: &SqlExpr) -> Result<SqlExpr> {
        Ok(expression.clone())
    }
}

/// Bottom-up rewrite: children first, then `f` on the rebuilt node.
///
/// `f` returns `None` to keep the node.
pub struct TransformVisitor<F>
where
    F: FnMut(&SqlExpr) -> Result<Option<SqlExpr>>,
{
    f: F,
}

impl<F> TransformVisitor<F>
where
    F: FnMut(&SqlExpr) -> Result<Option<SqlExpr>>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ExpressionVisitor for TransformVisitor<F>
where
    F: FnMut(&SqlExpr) -> Result<Option<SqlExpr>>,
{
    fn visit(&mut self, expression: &SqlExpr) -> Result<SqlExpr> {
        let visited = expression.visit_children(self)?;
        Ok((self.f)(&visited)?.unwrap_or(visited))
    }
}

/// Tracks whether any visited child differs from its original.
struct Children<'a> {
    visitor: &'a mut dyn ExpressionVisitor,
    changed: bool,
}

impl Children<'_> {
    fn one(&mut self, child: &SqlExpr) -> Result<SqlExpr> {
        let visited = self.visitor.visit(child)?;
        if !visited.ptr_eq(child) {
            self.changed = true;
        }
        Ok(visited)
    }

    fn opt(&mut self, child: &Option<SqlExpr>) -> Result<Option<SqlExpr>> {
        child.as_ref().map(|c| self.one(c)).transpose()
    }

    fn list(&mut self, children: &[SqlExpr]) -> Result<Vec<SqlExpr>> {
        children.iter().map(|c| self.one(c)).collect()
    }
}

impl SqlExpr {
    /// Apply `visitor` to each direct child.
    ///
    /// Returns this same handle when every child comes back pointer-equal,
    /// otherwise a new node of the same kind and type. Terminal nodes always
    /// return themselves. A grouping shaper cannot be rewritten generically
    /// and fails with [`QueryError::Unsupported`].
    pub fn visit_children(&self, visitor: &mut dyn ExpressionVisitor) -> Result<SqlExpr> {
        let mut children = Children {
            visitor,
            changed: false,
        };

        let kind = match self.kind() {
            ExpressionKind::Column(_)
            | ExpressionKind::Constant(_)
            | ExpressionKind::Parameter(_)
            | ExpressionKind::Fragment(_)
            | ExpressionKind::Table(_) => return Ok(self.clone()),

            ExpressionKind::GroupByShaper(_) => {
                return Err(QueryError::Unsupported(
                    "RelationalGroupByShaperExpression cannot be rewritten by visiting its \
                     children; translate the grouping as a whole"
                        .to_string(),
                ))
            }

            ExpressionKind::Binary(b) => ExpressionKind::Binary(SqlBinaryExpression {
                operator: b.operator,
                left: children.one(&b.left)?,
                right: children.one(&b.right)?,
            }),
            ExpressionKind::Unary(u) => ExpressionKind::Unary(SqlUnaryExpression {
                operator: u.operator,
                operand: children.one(&u.operand)?,
            }),
            ExpressionKind::Like(l) => ExpressionKind::Like(LikeExpression {
                match_expression: children.one(&l.match_expression)?,
                pattern: children.one(&l.pattern)?,
                escape_char: children.opt(&l.escape_char)?,
            }),
            ExpressionKind::Case(c) => {
                let operand = children.opt(&c.operand)?;
                let mut when_clauses = Vec::with_capacity(c.when_clauses.len());
                for clause in &c.when_clauses {
                    when_clauses.push(CaseWhenClause {
                        test: children.one(&clause.test)?,
                        result: children.one(&clause.result)?,
                    });
                }
                ExpressionKind::Case(CaseExpression {
                    operand,
                    when_clauses,
                    else_result: children.opt(&c.else_result)?,
                })
            }
            ExpressionKind::Function(f) => {
                let instance = children.opt(&f.instance().cloned())?;
                let arguments = match f.arguments() {
                    FunctionArguments::Niladic => FunctionArguments::Niladic,
                    FunctionArguments::WithArguments(args) => {
                        FunctionArguments::WithArguments(children.list(args)?)
                    }
                };
                ExpressionKind::Function(f.update(instance, arguments))
            }
            ExpressionKind::QueryRoot(root) => {
                ExpressionKind::QueryRoot(root.with_argument(children.one(&root.argument)?))
            }
            ExpressionKind::Select(s) => ExpressionKind::Select(SelectExpression {
                alias: s.alias.clone(),
                is_distinct: s.is_distinct,
                projection: children.list(&s.projection)?,
                tables: children.list(&s.tables)?,
                predicate: children.opt(&s.predicate)?,
                group_by: children.list(&s.group_by)?,
                having: children.opt(&s.having)?,
                orderings: children.list(&s.orderings)?,
                limit: children.opt(&s.limit)?,
                offset: children.opt(&s.offset)?,
            }),
            ExpressionKind::FromSql(f) => ExpressionKind::FromSql(FromSqlExpression {
                sql: f.sql.clone(),
                argument: children.one(&f.argument)?,
                alias: f.alias.clone(),
            }),
            ExpressionKind::Projection(p) => ExpressionKind::Projection(ProjectionExpression {
                expression: children.one(&p.expression)?,
                alias: p.alias.clone(),
            }),
            ExpressionKind::Ordering(o) => ExpressionKind::Ordering(OrderingExpression {
                expression: children.one(&o.expression)?,
                ascending: o.ascending,
            }),
        };

        if !children.changed {
            return Ok(self.clone());
        }
        Ok(SqlExpr::new(
            kind,
            self.value_type().clone(),
            self.type_mapping().cloned(),
        ))
    }

    /// Rewrite the whole tree bottom-up with `f`.
    pub fn transform<F>(&self, f: F) -> Result<SqlExpr>
    where
        F: FnMut(&SqlExpr) -> Result<Option<SqlExpr>>,
    {
        TransformVisitor::new(f).visit(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ValueType;
    use crate::core::value::SqlValue;
    use crate::expressions::{
        BinaryOperator, RelationalGroupByShaperExpression, SqlFunctionExpression,
        SqlQueryRootExpression, UnaryOperator,
    };

    fn col(name: &str) -> SqlExpr {
        SqlExpr::column(name, "b", ValueType::Int32, None, false)
    }

    fn int(n: i32) -> SqlExpr {
        SqlExpr::constant(SqlValue::I32(n), ValueType::Int32, None)
    }

    /// One tree covering every node kind except the grouping shaper.
    fn sample_trees() -> Vec<SqlExpr> {
        let predicate = SqlExpr::binary(
            BinaryOperator::GreaterThan,
            col("Rating"),
            SqlExpr::parameter("__rating_0", ValueType::Int32, None, false),
            ValueType::Bool,
            None,
        );
        let function = SqlExpr::function(
            SqlFunctionExpression::new("ABS", vec![col("Rating")], true, vec![true]).unwrap(),
            ValueType::Int32,
            None,
        );
        let case = SqlExpr::case(
            None,
            vec![CaseWhenClause {
                test: predicate.clone(),
                result: int(1),
            }],
            Some(int(0)),
            ValueType::Int32,
            None,
        );
        let like = SqlExpr::like(
            SqlExpr::column("Title", "b", ValueType::String, None, false),
            SqlExpr::constant(SqlValue::Text("a%".into()), ValueType::String, None),
            None,
            None,
        );
        let select = SqlExpr::select(
            SelectExpression {
                projection: vec![
                    SqlExpr::projection(function.clone(), "abs"),
                    SqlExpr::projection(case.clone(), "flag"),
                ],
                tables: vec![SqlExpr::table("Blogs", None, "b")],
                predicate: Some(predicate.clone()),
                orderings: vec![SqlExpr::ordering(col("Id"), true)],
                limit: Some(int(10)),
                ..SelectExpression::default()
            },
            ValueType::sequence_of(ValueType::Entity("Blog".into())),
        );
        let root = SqlExpr::query_root(SqlQueryRootExpression::new(
            "Blog",
            "SELECT * FROM Blogs",
            SqlExpr::parameter("p", ValueType::Object, None, false),
            None,
        ));
        let from_sql = SqlExpr::from_sql(
            "SELECT 1",
            SqlExpr::parameter("p", ValueType::Object, None, false),
            "f",
        );
        let not = SqlExpr::unary(UnaryOperator::Not, like.clone(), ValueType::Bool, None);

        vec![
            col("Id"),
            int(1),
            SqlExpr::fragment("*"),
            predicate,
            function,
            case,
            like,
            not,
            select,
            root,
            from_sql,
            SqlExpr::function(
                SqlFunctionExpression::niladic("CURRENT_TIMESTAMP", false),
                ValueType::DateTime,
                None,
            ),
        ]
    }

    #[test]
    fn test_identity_visitor_returns_same_node() {
        for tree in sample_trees() {
            let visited = tree.visit_children(&mut IdentityVisitor).unwrap();
            assert!(visited.ptr_eq(&tree), "rebuilt {}", tree.kind().name());
        }
    }

    #[test]
    fn test_deep_noop_transform_shares_tree() {
        for tree in sample_trees() {
            let visited = tree.transform(|_| Ok(None)).unwrap();
            assert!(visited.ptr_eq(&tree), "rebuilt {}", tree.kind().name());
        }
    }

    #[test]
    fn test_changed_child_rebuilds_only_the_path() {
        let left = col("Rating");
        let right = SqlExpr::binary(BinaryOperator::Add, int(1), int(2), ValueType::Int32, None);
        let tree = SqlExpr::binary(
            BinaryOperator::Equal,
            left.clone(),
            right.clone(),
            ValueType::Bool,
            None,
        );

        let rewritten = tree
            .transform(|e| match e.kind() {
                ExpressionKind::Constant(c) if c.value == SqlValue::I32(2) => Ok(Some(int(3))),
                _ => Ok(None),
            })
            .unwrap();

        assert!(!rewritten.ptr_eq(&tree));
        let ExpressionKind::Binary(b) = rewritten.kind() else {
            panic!("expected binary");
        };
        assert!(b.left.ptr_eq(&left));
        assert!(!b.right.ptr_eq(&right));
        assert_eq!(rewritten.value_type(), &ValueType::Bool);
    }

    #[test]
    fn test_function_rewrite_keeps_metadata() {
        let func = SqlFunctionExpression::new("ABS", vec![int(-1)], false, vec![true])
            .unwrap()
            .with_schema("dbo");
        let tree = SqlExpr::function(func, ValueType::Int32, None);

        let rewritten = tree.transform(|e| match e.kind() {
            ExpressionKind::Constant(_) => Ok(Some(int(5))),
            _ => Ok(None),
        });
        let rewritten = rewritten.unwrap();

        let ExpressionKind::Function(f) = rewritten.kind() else {
            panic!("expected function");
        };
        assert_eq!(f.schema(), Some("dbo"));
        assert!(!f.is_built_in());
        assert_eq!(f.arguments_propagate_nullability(), Some(&[true][..]));
        assert_eq!(f.arguments().as_slice()[0], int(5));
    }

    #[test]
    fn test_group_by_shaper_refuses_generic_rewrite() {
        let enumerable = SqlExpr::select(
            SelectExpression::from_table(SqlExpr::table("Orders", None, "o")),
            ValueType::sequence_of(ValueType::Entity("Order".into())),
        );
        let shaper = SqlExpr::group_by_shaper(RelationalGroupByShaperExpression::new(
            col("CustomerId"),
            SqlExpr::fragment("*"),
            enumerable,
        ));

        let err = shaper.visit_children(&mut IdentityVisitor).unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
    }
}
