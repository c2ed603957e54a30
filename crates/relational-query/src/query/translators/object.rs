//! `Equals`, on any type.

use crate::error::Result;
use crate::expressions::SqlExpr;
use crate::query::expression::MethodInfo;
use crate::query::factory::SqlExpressionFactory;

use super::MethodCallTranslator;

/// `a.Equals(b)` and `Object.Equals(a, b)` as `a = b`.
#[derive(Debug, Default)]
pub struct EqualsTranslator;

impl MethodCallTranslator for EqualsTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> Result<Option<SqlExpr>> {
        if method.name != "Equals" {
            return Ok(None);
        }

        let (left, right) = match (instance, arguments) {
            (Some(instance), [other]) => (instance, other),
            (None, [left, right]) => (left, right),
            _ => return Ok(None),
        };

        // Mismatched logical types never compare equal in the source language.
        if left.value_type() != right.value_type()
            && left.value_type().is_scalar()
            && right.value_type().is_scalar()
        {
            return Ok(None);
        }

        factory.equal(left.clone(), right.clone()).map(Some)
    }
}
