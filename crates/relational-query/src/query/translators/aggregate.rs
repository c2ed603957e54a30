//! `Enumerable`/`Queryable` aggregates over a group.

use crate::core::traits::BuiltinFunction;
use crate::core::types::ValueType;
use crate::error::Result;
use crate::expressions::SqlExpr;
use crate::query::expression::MethodInfo;
use crate::query::factory::SqlExpressionFactory;

use super::AggregateMethodCallTranslator;

#[derive(Debug, Default)]
pub struct QueryableAggregateMethodTranslator;

impl AggregateMethodCallTranslator for QueryableAggregateMethodTranslator {
    fn translate(
        &self,
        method: &MethodInfo,
        _source: &SqlExpr,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> Result<Option<SqlExpr>> {
        if !matches!(method.declaring_type.as_str(), "Enumerable" | "Queryable") {
            return Ok(None);
        }

        let translated = match (method.name.as_str(), arguments) {
            ("Count", []) => factory.aggregate_star(BuiltinFunction::Count, ValueType::Int32)?,
            ("LongCount", []) => factory.aggregate_star(BuiltinFunction::LongCount, ValueType::Int64)?,
            ("Sum", [selector]) => same_type(factory, BuiltinFunction::Sum, selector)?,
            ("Min", [selector]) => same_type(factory, BuiltinFunction::Min, selector)?,
            ("Max", [selector]) => same_type(factory, BuiltinFunction::Max, selector)?,
            ("Average", [selector]) => {
                let value_type = match selector.value_type() {
                    ValueType::Decimal => ValueType::Decimal,
                    ValueType::Float32 => ValueType::Float32,
                    _ => ValueType::Float64,
                };
                factory.builtin(BuiltinFunction::Avg, vec![selector.clone()], value_type, None)?
            }
            _ => return Ok(None),
        };
        Ok(Some(translated))
    }
}

fn same_type(factory: &SqlExpressionFactory, function: BuiltinFunction, selector: &SqlExpr) -> Result<SqlExpr> {
    factory.builtin(
        function,
        vec![selector.clone()],
        selector.value_type().clone(),
        selector.type_mapping().cloned(),
    )
}
