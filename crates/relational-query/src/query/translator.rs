//! Translation of lambda bodies into SQL expressions.

use crate::core::types::ValueType;
use crate::error::{QueryError, Result};
use crate::expressions::{CaseWhenClause, SqlExpr};
use crate::storage::model::EntityType;

use super::context::QueryCompilationContext;
use super::expression::{Expression, MethodInfo};

/// Translates [`Expression`]s over one entity, whose table is in scope under
/// `table_alias`.
pub struct SqlTranslator<'a> {
    ctx: &'a QueryCompilationContext,
    entity: &'a EntityType,
    table_alias: &'a str,
}

impl<'a> SqlTranslator<'a> {
    pub fn new(ctx: &'a QueryCompilationContext, entity: &'a EntityType, table_alias: &'a str) -> Self {
        Self {
            ctx,
            entity,
            table_alias,
        }
    }

    /// Translate and give the result its default type mapping if it has none.
    pub fn translate(&self, expression: &Expression) -> Result<SqlExpr> {
        let translated = self.visit(expression)?;
        Ok(self.ctx.factory().apply_default_type_mapping(&translated))
    }

    /// Translate a filter; the result must be boolean.
    pub fn translate_predicate(&self, expression: &Expression) -> Result<SqlExpr> {
        let predicate = self.translate(expression)?;
        if *predicate.value_type() != ValueType::Bool {
            return Err(QueryError::translation(
                "predicate",
                format!("expected a bool expression, got {}", predicate.value_type()),
            ));
        }
        Ok(predicate)
    }

    /// Translate an aggregate over the rows of `source`.
    pub fn translate_aggregate(
        &self,
        method: &MethodInfo,
        source: &SqlExpr,
        selector: Option<&Expression>,
    ) -> Result<SqlExpr> {
        let arguments = selector
            .map(|s| self.translate(s))
            .transpose()?
            .into_iter()
            .collect::<Vec<_>>();

        self.ctx
            .aggregate_translators()
            .translate(method, source, &arguments, self.ctx.factory())?
            .ok_or_else(|| untranslatable(method, arguments.len()))
    }

    fn visit(&self, expression: &Expression) -> Result<SqlExpr> {
        let factory = self.ctx.factory();
        match expression {
            Expression::Constant { value, value_type } => {
                let value_type = value_type
                    .clone()
                    .or_else(|| value.value_type())
                    .unwrap_or(ValueType::Object);
                Ok(factory.constant(value.clone(), value_type))
            }
            Expression::Parameter { name, value_type } => {
                Ok(factory.parameter(name, value_type.clone(), true))
            }
            Expression::Property { name } => {
                let property = self.entity.find_property(name).ok_or_else(|| {
                    QueryError::translation(
                        format!("property '{}'", name),
                        format!("'{}' is not a mapped property of entity type '{}'", name, self.entity.name),
                    )
                })?;
                factory.column(self.entity, property, self.table_alias)
            }
            Expression::MethodCall {
                instance,
                method,
                arguments,
            } => {
                let instance = instance.as_deref().map(|i| self.visit(i)).transpose()?;
                let arguments = arguments
                    .iter()
                    .map(|a| self.visit(a))
                    .collect::<Result<Vec<_>>>()?;

                self.ctx
                    .method_translators()
                    .translate(instance.as_ref(), method, &arguments, factory)?
                    .ok_or_else(|| untranslatable(method, arguments.len()))
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => factory.binary(*operator, self.visit(left)?, self.visit(right)?),
            Expression::Not { operand } => {
                let operand = self.visit(operand)?;
                if *operand.value_type() != ValueType::Bool {
                    return Err(QueryError::translation(
                        "operator !",
                        format!("operand must be bool, got {}", operand.value_type()),
                    ));
                }
                Ok(factory.not(operand))
            }
            Expression::Negate { operand } => Ok(factory.negate(self.visit(operand)?)),
            Expression::Conditional {
                test,
                if_true,
                if_false,
            } => factory.case(
                vec![CaseWhenClause {
                    test: self.visit(test)?,
                    result: self.visit(if_true)?,
                }],
                Some(self.visit(if_false)?),
            ),
        }
    }
}

fn untranslatable(method: &MethodInfo, argument_count: usize) -> QueryError {
    QueryError::translation(
        format!("method '{}'", method),
        format!(
            "no translation to SQL is available for a call with {} argument(s)",
            argument_count
        ),
    )
}
