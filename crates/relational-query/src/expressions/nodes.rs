//! Scalar nodes: columns, values, operators and conditionals.

use serde::{Deserialize, Serialize};

use crate::core::value::SqlValue;

use super::SqlExpr;

/// Reference to a column of a table in the `FROM` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnExpression {
    pub name: String,
    pub table_alias: String,
    pub is_nullable: bool,
}

/// Inline literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstantExpression {
    pub value: SqlValue,
}

/// Value bound as a command parameter at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterExpression {
    pub name: String,
    pub is_nullable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::AndAlso | BinaryOperator::OrElse)
    }

    pub fn is_arithmetic(&self) -> bool {
        !self.is_comparison() && !self.is_logical()
    }

    /// SQL operator text. String concatenation is dialect-specific and is
    /// chosen by the generator instead.
    pub fn sql(&self) -> &'static str {
        match self {
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::AndAlso => "AND",
            BinaryOperator::OrElse => "OR",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }

    /// Operator as shown in debug output.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::AndAlso => "&&",
            BinaryOperator::OrElse => "||",
            other => other.sql(),
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 6,
            BinaryOperator::Add | BinaryOperator::Subtract => 5,
            BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqual => 4,
            BinaryOperator::Equal | BinaryOperator::NotEqual => 3,
            BinaryOperator::AndAlso => 2,
            BinaryOperator::OrElse => 1,
        }
    }

    /// Whether `a op (b op c)` equals `(a op b) op c`.
    pub fn is_associative(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Multiply
                | BinaryOperator::AndAlso
                | BinaryOperator::OrElse
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlBinaryExpression {
    pub operator: BinaryOperator,
    pub left: SqlExpr,
    pub right: SqlExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlUnaryExpression {
    pub operator: UnaryOperator,
    pub operand: SqlExpr,
}

/// `match LIKE pattern [ESCAPE escape]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LikeExpression {
    pub match_expression: SqlExpr,
    pub pattern: SqlExpr,
    pub escape_char: Option<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseWhenClause {
    pub test: SqlExpr,
    pub result: SqlExpr,
}

/// `CASE [operand] WHEN .. THEN .. [ELSE ..] END`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseExpression {
    pub operand: Option<SqlExpr>,
    pub when_clauses: Vec<CaseWhenClause>,
    pub else_result: Option<SqlExpr>,
}
