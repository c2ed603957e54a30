//! `Math` static methods.

use crate::core::traits::BuiltinFunction;
use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::error::Result;
use crate::expressions::SqlExpr;
use crate::query::expression::MethodInfo;
use crate::query::factory::SqlExpressionFactory;

use super::MethodCallTranslator;

#[derive(Debug, Default)]
pub struct MathTranslator;

impl MethodCallTranslator for MathTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> Result<Option<SqlExpr>> {
        if method.declaring_type != "Math" || instance.is_some() {
            return Ok(None);
        }

        let function = match (method.name.as_str(), arguments.len()) {
            ("Abs", 1) => BuiltinFunction::Abs,
            ("Ceiling", 1) => BuiltinFunction::Ceiling,
            ("Floor", 1) => BuiltinFunction::Floor,
            ("Sqrt", 1) => BuiltinFunction::Sqrt,
            ("Power", 2) => BuiltinFunction::Power,
            ("Round", 1 | 2) => BuiltinFunction::Round,
            ("Max", 2) => BuiltinFunction::Greatest,
            ("Min", 2) => BuiltinFunction::Least,
            _ => return Ok(None),
        };

        let mut arguments = arguments.to_vec();
        if function == BuiltinFunction::Round
            && arguments.len() == 1
            && factory.dialect().round_requires_length()
        {
            arguments.push(factory.constant(SqlValue::I32(0), ValueType::Int32));
        }

        let translated = match function {
            BuiltinFunction::Sqrt | BuiltinFunction::Power => {
                factory.builtin(function, arguments, ValueType::Float64, None)?
            }
            _ => {
                let value_type = arguments[0].value_type().clone();
                let mapping = arguments
                    .iter()
                    .find_map(|a| a.type_mapping().cloned());
                factory.builtin(function, arguments, value_type, mapping)?
            }
        };
        Ok(Some(translated))
    }
}
