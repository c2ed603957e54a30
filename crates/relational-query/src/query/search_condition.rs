//! Separates search conditions from boolean values.
//!
//! SQL Server has no boolean value type: `WHERE b.IsActive` is invalid and
//! a comparison cannot be projected. This pass rewrites
//!
//! - a boolean value where a condition is expected into `value = CAST(1 AS bit)`
//! - a condition where a value is expected into
//!   `CASE WHEN condition THEN CAST(1 AS bit) ELSE CAST(0 AS bit) END`

use std::mem;

use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::error::Result;
use crate::expressions::{
    BinaryOperator, CaseExpression, CaseWhenClause, ExpressionKind, ExpressionVisitor,
    SelectExpression, SqlExpr, UnaryOperator,
};

use super::factory::SqlExpressionFactory;

pub struct SearchConditionConverter<'a> {
    factory: &'a SqlExpressionFactory,
    is_search_condition: bool,
    changed: bool,
}

impl<'a> SearchConditionConverter<'a> {
    pub fn new(factory: &'a SqlExpressionFactory) -> Self {
        Self::in_context(factory, false)
    }

    fn in_context(factory: &'a SqlExpressionFactory, is_search_condition: bool) -> Self {
        Self {
            factory,
            is_search_condition,
            changed: false,
        }
    }

    /// Visit `expression` with the given context, restoring the current one.
    fn visit_as(&mut self, expression: &SqlExpr, is_search_condition: bool) -> Result<SqlExpr> {
        let previous = mem::replace(&mut self.is_search_condition, is_search_condition);
        let outer_changed = mem::replace(&mut self.changed, false);
        let visited = self.visit(expression);
        self.is_search_condition = previous;
        self.changed = outer_changed;
        let visited = visited?;
        if !visited.ptr_eq(expression) {
            self.changed = true;
        }
        Ok(visited)
    }

    fn visit_opt(&mut self, expression: &Option<SqlExpr>, is_search_condition: bool) -> Result<Option<SqlExpr>> {
        expression
            .as_ref()
            .map(|e| self.visit_as(e, is_search_condition))
            .transpose()
    }

    fn visit_values(&mut self, expressions: &[SqlExpr]) -> Result<Vec<SqlExpr>> {
        expressions.iter().map(|e| self.visit_as(e, false)).collect()
    }

    /// Rebuild with every child visited in one context.
    fn children_as(&self, expression: &SqlExpr, is_search_condition: bool) -> Result<SqlExpr> {
        let mut inner = Self::in_context(self.factory, is_search_condition);
        expression.visit_children(&mut inner)
    }

    fn visit_select(&mut self, expression: &SqlExpr, select: &SelectExpression) -> Result<SqlExpr> {
        self.changed = false;
        let rebuilt = SelectExpression {
            alias: select.alias.clone(),
            is_distinct: select.is_distinct,
            projection: self.visit_values(&select.projection)?,
            tables: self.visit_values(&select.tables)?,
            predicate: self.visit_opt(&select.predicate, true)?,
            group_by: self.visit_values(&select.group_by)?,
            having: self.visit_opt(&select.having, true)?,
            orderings: self.visit_values(&select.orderings)?,
            limit: self.visit_opt(&select.limit, false)?,
            offset: self.visit_opt(&select.offset, false)?,
        };
        if !self.changed {
            return Ok(expression.clone());
        }
        Ok(SqlExpr::new(
            ExpressionKind::Select(rebuilt),
            expression.value_type().clone(),
            expression.type_mapping().cloned(),
        ))
    }

    fn visit_case(&mut self, expression: &SqlExpr, case: &CaseExpression) -> Result<SqlExpr> {
        self.changed = false;
        // Simple CASE compares values against the operand; searched CASE tests conditions.
        let tests_are_conditions = case.operand.is_none();
        let operand = self.visit_opt(&case.operand, false)?;
        let mut when_clauses = Vec::with_capacity(case.when_clauses.len());
        for clause in &case.when_clauses {
            when_clauses.push(CaseWhenClause {
                test: self.visit_as(&clause.test, tests_are_conditions)?,
                result: self.visit_as(&clause.result, false)?,
            });
        }
        let else_result = self.visit_opt(&case.else_result, false)?;
        if !self.changed {
            return Ok(expression.clone());
        }
        Ok(SqlExpr::case(
            operand,
            when_clauses,
            else_result,
            expression.value_type().clone(),
            expression.type_mapping().cloned(),
        ))
    }

    fn bool_constant(&self, value: bool) -> SqlExpr {
        self.factory
            .apply_default_type_mapping(&self.factory.constant(SqlValue::Bool(value), ValueType::Bool))
    }

    /// Adapt a visited node to the context it appears in.
    fn convert(&self, expression: SqlExpr) -> Result<SqlExpr> {
        let is_condition = expression.is_condition();
        if self.is_search_condition && !is_condition && *expression.value_type() == ValueType::Bool {
            return self
                .factory
                .binary(BinaryOperator::Equal, expression, self.bool_constant(true));
        }
        if !self.is_search_condition && is_condition {
            return self.factory.case(
                vec![CaseWhenClause {
                    test: expression,
                    result: self.bool_constant(true),
                }],
                Some(self.bool_constant(false)),
            );
        }
        Ok(expression)
    }
}

impl ExpressionVisitor for SearchConditionConverter<'_> {
    fn visit(&mut self, expression: &SqlExpr) -> Result<SqlExpr> {
        let visited = match expression.kind() {
            ExpressionKind::Select(select) => return self.visit_select(expression, select),
            ExpressionKind::Case(case) => self.visit_case(expression, case)?,
            ExpressionKind::Binary(b) if b.operator.is_logical() => self.children_as(expression, true)?,
            ExpressionKind::Unary(u) if u.operator == UnaryOperator::Not => self.children_as(expression, true)?,
            _ => self.children_as(expression, false)?,
        };
        self.convert(visited)
    }
}
