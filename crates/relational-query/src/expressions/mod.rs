//! SQL expression tree.
//!
//! Every node is a [`SqlExpression`]: a logical [`ValueType`], an optional
//! store [`RelationalTypeMapping`], and one [`ExpressionKind`] variant. Nodes
//! are immutable and shared through [`SqlExpr`] (an `Arc` handle), so
//! rewriting a tree only allocates along the path that actually changed.
//!
//! # Tree operations
//!
//! - [`SqlExpr::visit_children`]: rebuild a node from visited children,
//!   returning the same handle when nothing changed ([`visitor`])
//! - [`SqlExpr::print`]: debug rendering ([`printer`])
//! - `PartialEq` / `Hash`: structural comparison, used for deduplication
//!   and cache keys
//! - [`SqlExpr::quote`]: serializable builder form that reconstructs an
//!   equal node ([`quote`])

mod fragment;
mod function;
mod group_by_shaper;
mod nodes;
pub mod printer;
mod query_root;
pub mod quote;
mod select;
pub mod visitor;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::typemap::RelationalTypeMapping;

pub use fragment::SqlFragmentExpression;
pub use function::{FunctionArguments, SqlFunctionExpression};
pub use group_by_shaper::RelationalGroupByShaperExpression;
pub use nodes::{
    BinaryOperator, CaseExpression, CaseWhenClause, ColumnExpression, ConstantExpression,
    LikeExpression, ParameterExpression, SqlBinaryExpression, SqlUnaryExpression, UnaryOperator,
};
pub use printer::ExpressionPrinter;
pub use query_root::{QueryProvider, SqlQueryRootExpression};
pub use quote::{QuotedExpression, QuotedNode};
pub use select::{
    FromSqlExpression, OrderingExpression, ProjectionExpression, SelectExpression,
    TableExpression,
};
pub use visitor::{ExpressionVisitor, IdentityVisitor, TransformVisitor};

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum ExpressionKind {
    Column(ColumnExpression),
    Constant(ConstantExpression),
    Parameter(ParameterExpression),
    Binary(SqlBinaryExpression),
    Unary(SqlUnaryExpression),
    Like(LikeExpression),
    Case(CaseExpression),
    Function(SqlFunctionExpression),
    Fragment(SqlFragmentExpression),
    QueryRoot(SqlQueryRootExpression),
    GroupByShaper(RelationalGroupByShaperExpression),
    Select(SelectExpression),
    Table(TableExpression),
    FromSql(FromSqlExpression),
    Projection(ProjectionExpression),
    Ordering(OrderingExpression),
}

impl ExpressionKind {
    /// Short node name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ExpressionKind::Column(_) => "ColumnExpression",
            ExpressionKind::Constant(_) => "SqlConstantExpression",
            ExpressionKind::Parameter(_) => "SqlParameterExpression",
            ExpressionKind::Binary(_) => "SqlBinaryExpression",
            ExpressionKind::Unary(_) => "SqlUnaryExpression",
            ExpressionKind::Like(_) => "LikeExpression",
            ExpressionKind::Case(_) => "CaseExpression",
            ExpressionKind::Function(_) => "SqlFunctionExpression",
            ExpressionKind::Fragment(_) => "SqlFragmentExpression",
            ExpressionKind::QueryRoot(_) => "SqlQueryRootExpression",
            ExpressionKind::GroupByShaper(_) => "RelationalGroupByShaperExpression",
            ExpressionKind::Select(_) => "SelectExpression",
            ExpressionKind::Table(_) => "TableExpression",
            ExpressionKind::FromSql(_) => "FromSqlExpression",
            ExpressionKind::Projection(_) => "ProjectionExpression",
            ExpressionKind::Ordering(_) => "OrderingExpression",
        }
    }
}

/// One node of the SQL expression tree.
#[derive(Debug, Clone)]
pub struct SqlExpression {
    value_type: ValueType,
    type_mapping: Option<Arc<RelationalTypeMapping>>,
    kind: ExpressionKind,
}

impl SqlExpression {
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn type_mapping(&self) -> Option<&Arc<RelationalTypeMapping>> {
        self.type_mapping.as_ref()
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }
}

impl PartialEq for SqlExpression {
    fn eq(&self, other: &Self) -> bool {
        self.value_type == other.value_type
            && self.type_mapping == other.type_mapping
            && self.kind == other.kind
    }
}

impl Hash for SqlExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_type.hash(state);
        self.type_mapping.hash(state);
        self.kind.hash(state);
    }
}

/// Shared handle to an immutable [`SqlExpression`].
///
/// Equality is pointer identity first, then structural. A node always equals
/// itself, even when its structural rule says otherwise (the `*` fragment).
#[derive(Clone)]
pub struct SqlExpr(Arc<SqlExpression>);

impl SqlExpr {
    /// Wrap a node kind with its type information.
    pub fn new(
        kind: ExpressionKind,
        value_type: ValueType,
        type_mapping: Option<Arc<RelationalTypeMapping>>,
    ) -> Self {
        SqlExpr(Arc::new(SqlExpression {
            value_type,
            type_mapping,
            kind,
        }))
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &SqlExpr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Same node with a different type mapping.
    pub fn with_type_mapping(&self, type_mapping: Option<Arc<RelationalTypeMapping>>) -> SqlExpr {
        if self.type_mapping == type_mapping {
            return self.clone();
        }
        SqlExpr::new(self.kind.clone(), self.value_type.clone(), type_mapping)
    }

    pub fn column(
        name: impl Into<String>,
        table_alias: impl Into<String>,
        value_type: ValueType,
        type_mapping: Option<Arc<RelationalTypeMapping>>,
        is_nullable: bool,
    ) -> Self {
        SqlExpr::new(
            ExpressionKind::Column(ColumnExpression {
                name: name.into(),
                table_alias: table_alias.into(),
                is_nullable,
            }),
            value_type,
            type_mapping,
        )
    }

    pub fn constant(
        value: SqlValue,
        value_type: ValueType,
        type_mapping: Option<Arc<RelationalTypeMapping>>,
    ) -> Self {
        SqlExpr::new(
            ExpressionKind::Constant(ConstantExpression { value }),
            value_type,
            type_mapping,
        )
    }

    pub fn parameter(
        name: impl Into<String>,
        value_type: ValueType,
        type_mapping: Option<Arc<RelationalTypeMapping>>,
        is_nullable: bool,
    ) -> Self {
        SqlExpr::new(
            ExpressionKind::Parameter(ParameterExpression {
                name: name.into(),
                is_nullable,
            }),
            value_type,
            type_mapping,
        )
    }

    pub fn binary(
        operator: BinaryOperator,
        left: SqlExpr,
        right: SqlExpr,
        value_type: ValueType,
        type_mapping: Option<Arc<RelationalTypeMapping>>,
    ) -> Self {
        SqlExpr::new(
            ExpressionKind::Binary(SqlBinaryExpression {
                operator,
                left,
                right,
            }),
            value_type,
            type_mapping,
        )
    }

    pub fn unary(
        operator: UnaryOperator,
        operand: SqlExpr,
        value_type: ValueType,
        type_mapping: Option<Arc<RelationalTypeMapping>>,
    ) -> Self {
        SqlExpr::new(
            ExpressionKind::Unary(SqlUnaryExpression { operator, operand }),
            value_type,
            type_mapping,
        )
    }

    pub fn like(
        match_expression: SqlExpr,
        pattern: SqlExpr,
        escape_char: Option<SqlExpr>,
        type_mapping: Option<Arc<RelationalTypeMapping>>,
    ) -> Self {
        SqlExpr::new(
            ExpressionKind::Like(LikeExpression {
                match_expression,
                pattern,
                escape_char,
            }),
            ValueType::Bool,
            type_mapping,
        )
    }

    pub fn case(
        operand: Option<SqlExpr>,
        when_clauses: Vec<CaseWhenClause>,
        else_result: Option<SqlExpr>,
        value_type: ValueType,
        type_mapping: Option<Arc<RelationalTypeMapping>>,
    ) -> Self {
        SqlExpr::new(
            ExpressionKind::Case(CaseExpression {
                operand,
                when_clauses,
                else_result,
            }),
            value_type,
            type_mapping,
        )
    }

    pub fn function(
        function: SqlFunctionExpression,
        value_type: ValueType,
        type_mapping: Option<Arc<RelationalTypeMapping>>,
    ) -> Self {
        SqlExpr::new(ExpressionKind::Function(function), value_type, type_mapping)
    }

    /// Verbatim SQL token.
    pub fn fragment(sql: impl Into<String>) -> Self {
        SqlExpr::new(
            ExpressionKind::Fragment(SqlFragmentExpression::new(sql)),
            ValueType::Object,
            None,
        )
    }

    pub fn query_root(root: SqlQueryRootExpression) -> Self {
        let value_type = ValueType::sequence_of(ValueType::Entity(root.element_type.clone()));
        SqlExpr::new(ExpressionKind::QueryRoot(root), value_type, None)
    }

    pub fn group_by_shaper(shaper: RelationalGroupByShaperExpression) -> Self {
        let value_type = ValueType::Grouping {
            key: Box::new(shaper.key_selector.value_type().clone()),
            element: Box::new(shaper.element_selector.value_type().clone()),
        };
        SqlExpr::new(ExpressionKind::GroupByShaper(shaper), value_type, None)
    }

    pub fn select(select: SelectExpression, value_type: ValueType) -> Self {
        SqlExpr::new(ExpressionKind::Select(select), value_type, None)
    }

    pub fn table(
        name: impl Into<String>,
        schema: Option<String>,
        alias: impl Into<String>,
    ) -> Self {
        SqlExpr::new(
            ExpressionKind::Table(TableExpression {
                name: name.into(),
                schema,
                alias: alias.into(),
            }),
            ValueType::Object,
            None,
        )
    }

    pub fn from_sql(sql: impl Into<String>, argument: SqlExpr, alias: impl Into<String>) -> Self {
        SqlExpr::new(
            ExpressionKind::FromSql(FromSqlExpression {
                sql: sql.into(),
                argument,
                alias: alias.into(),
            }),
            ValueType::Object,
            None,
        )
    }

    pub fn projection(expression: SqlExpr, alias: impl Into<String>) -> Self {
        let value_type = expression.value_type().clone();
        let type_mapping = expression.type_mapping().cloned();
        SqlExpr::new(
            ExpressionKind::Projection(ProjectionExpression {
                expression,
                alias: alias.into(),
            }),
            value_type,
            type_mapping,
        )
    }

    pub fn ordering(expression: SqlExpr, ascending: bool) -> Self {
        let value_type = expression.value_type().clone();
        let type_mapping = expression.type_mapping().cloned();
        SqlExpr::new(
            ExpressionKind::Ordering(OrderingExpression {
                expression,
                ascending,
            }),
            value_type,
            type_mapping,
        )
    }

    /// Whether the node yields a SQL search condition (a predicate) rather
    /// than a value.
    pub fn is_condition(&self) -> bool {
        match self.kind() {
            ExpressionKind::Binary(b) => b.operator.is_comparison() || b.operator.is_logical(),
            ExpressionKind::Unary(u) => matches!(
                u.operator,
                UnaryOperator::Not | UnaryOperator::IsNull | UnaryOperator::IsNotNull
            ),
            ExpressionKind::Like(_) => true,
            _ => false,
        }
    }
}

impl Deref for SqlExpr {
    type Target = SqlExpression;

    fn deref(&self) -> &SqlExpression {
        &self.0
    }
}

impl PartialEq for SqlExpr {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl Eq for SqlExpr {}

impl Hash for SqlExpr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&ExpressionPrinter::print_expression(self))
    }
}
