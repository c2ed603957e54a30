//! `String` instance methods and members.

use crate::core::traits::BuiltinFunction;
use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::error::Result;
use crate::expressions::{BinaryOperator, CaseWhenClause, ExpressionKind, SqlExpr};
use crate::query::expression::MethodInfo;
use crate::query::factory::SqlExpressionFactory;

use super::MethodCallTranslator;

const LIKE_ESCAPE: char = '\\';

#[derive(Debug, Default)]
pub struct StringMethodTranslator;

impl MethodCallTranslator for StringMethodTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> Result<Option<SqlExpr>> {
        if method.declaring_type != "String" {
            return Ok(None);
        }
        let Some(instance) = instance else {
            return Ok(None);
        };
        let mapping = instance.type_mapping().cloned();
        let string = |function, args: Vec<SqlExpr>| {
            factory.builtin(function, args, ValueType::String, mapping.clone())
        };

        let translated = match (method.name.as_str(), arguments) {
            ("ToUpper", []) => string(BuiltinFunction::Upper, vec![instance.clone()])?,
            ("ToLower", []) => string(BuiltinFunction::Lower, vec![instance.clone()])?,
            ("Trim", []) => string(BuiltinFunction::Trim, vec![instance.clone()])?,
            ("TrimStart", []) => string(BuiltinFunction::TrimStart, vec![instance.clone()])?,
            ("TrimEnd", []) => string(BuiltinFunction::TrimEnd, vec![instance.clone()])?,
            ("Length", []) => {
                factory.builtin(BuiltinFunction::Length, vec![instance.clone()], ValueType::Int32, None)?
            }
            ("Replace", [old, new]) => string(
                BuiltinFunction::Replace,
                vec![instance.clone(), old.clone(), new.clone()],
            )?,
            ("Substring", [start]) => {
                let length = factory.builtin(
                    BuiltinFunction::Length,
                    vec![instance.clone()],
                    ValueType::Int32,
                    None,
                )?;
                string(
                    BuiltinFunction::Substring,
                    vec![instance.clone(), one_based(factory, start)?, length],
                )?
            }
            ("Substring", [start, length]) => string(
                BuiltinFunction::Substring,
                vec![instance.clone(), one_based(factory, start)?, length.clone()],
            )?,
            ("IndexOf", [value]) => index_of(factory, instance, value)?,
            ("Contains", [value]) => match string_constant(value) {
                Some(text) => like_constant(factory, instance, &format!("%{}%", escape_like(text)), text),
                None => {
                    let value = &matching(factory, instance, value);
                    let found = factory.binary(
                        BinaryOperator::GreaterThan,
                        position(factory, instance, value)?,
                        factory.constant(SqlValue::I32(0), ValueType::Int32),
                    )?;
                    if factory.dialect().empty_search_not_found() {
                        factory.binary(BinaryOperator::OrElse, is_empty(factory, value), found)?
                    } else {
                        found
                    }
                }
            },
            ("StartsWith", [value]) => match string_constant(value) {
                Some(text) => like_constant(factory, instance, &format!("{}%", escape_like(text)), text),
                None => affix_equals(factory, BuiltinFunction::Left, instance, value)?,
            },
            ("EndsWith", [value]) => match string_constant(value) {
                Some(text) => like_constant(factory, instance, &format!("%{}", escape_like(text)), text),
                None => affix_equals(factory, BuiltinFunction::Right, instance, value)?,
            },
            _ => return Ok(None),
        };

        Ok(Some(translated))
    }
}

fn string_constant(expr: &SqlExpr) -> Option<&str> {
    match expr.kind() {
        ExpressionKind::Constant(c) => c.value.as_str(),
        _ => None,
    }
}

fn needs_escape(c: char) -> bool {
    matches!(c, '%' | '_' | '[' | LIKE_ESCAPE)
}

/// Escape LIKE wildcards in a literal search string.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if needs_escape(c) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn like_constant(factory: &SqlExpressionFactory, instance: &SqlExpr, pattern: &str, original: &str) -> SqlExpr {
    let escape = original.chars().any(needs_escape).then(|| {
        factory.constant(SqlValue::Text(LIKE_ESCAPE.to_string()), ValueType::String)
    });
    factory.like(
        instance.clone(),
        factory.constant(SqlValue::Text(pattern.to_string()), ValueType::String),
        escape,
    )
}

/// `LEFT(instance, LENGTH(value)) = value` (or `RIGHT`), which compares
/// the runtime value literally where a LIKE pattern would treat `%` and `_`
/// inside it as wildcards.
fn affix_equals(
    factory: &SqlExpressionFactory,
    function: BuiltinFunction,
    instance: &SqlExpr,
    value: &SqlExpr,
) -> Result<SqlExpr> {
    let value = matching(factory, instance, value);
    let length = factory.builtin(BuiltinFunction::Length, vec![value.clone()], ValueType::Int32, None)?;
    let affix = factory.builtin(
        function,
        vec![instance.clone(), length],
        ValueType::String,
        instance.type_mapping().cloned(),
    )?;
    factory.equal(affix, value)
}

/// Zero-based `IndexOf`; an empty search string is found at 0.
fn index_of(factory: &SqlExpressionFactory, instance: &SqlExpr, value: &SqlExpr) -> Result<SqlExpr> {
    if string_constant(value) == Some("") {
        return Ok(factory.constant(SqlValue::I32(0), ValueType::Int32));
    }
    let value = &matching(factory, instance, value);
    let index = factory.binary(
        BinaryOperator::Subtract,
        position(factory, instance, value)?,
        factory.constant(SqlValue::I32(1), ValueType::Int32),
    )?;
    if string_constant(value).is_some() || !factory.dialect().empty_search_not_found() {
        return Ok(index);
    }
    factory.case(
        vec![CaseWhenClause {
            test: is_empty(factory, value),
            result: factory.constant(SqlValue::I32(0), ValueType::Int32),
        }],
        Some(index),
    )
}

/// `value` with the string mapping of `instance`, so a parameter binds
/// with the column's store type.
fn matching(factory: &SqlExpressionFactory, instance: &SqlExpr, value: &SqlExpr) -> SqlExpr {
    factory.apply_type_mapping(value, instance.type_mapping().cloned())
}

/// `value LIKE ''`, true only for the empty string.
fn is_empty(factory: &SqlExpressionFactory, value: &SqlExpr) -> SqlExpr {
    factory.like(
        value.clone(),
        factory.constant(SqlValue::Text(String::new()), ValueType::String),
        None,
    )
}

/// Zero-based index expression as a one-based SQL position.
fn one_based(factory: &SqlExpressionFactory, index: &SqlExpr) -> Result<SqlExpr> {
    if let ExpressionKind::Constant(c) = index.kind() {
        if let Some(n) = c.value.as_i64().and_then(|n| n.checked_add(1)) {
            return Ok(factory.constant(SqlValue::I64(n), ValueType::Int64));
        }
    }
    factory.binary(
        BinaryOperator::Add,
        index.clone(),
        factory.constant(SqlValue::I32(1), ValueType::Int32),
    )
}

/// One-based position of `value` in `instance`, 0 when absent.
fn position(factory: &SqlExpressionFactory, instance: &SqlExpr, value: &SqlExpr) -> Result<SqlExpr> {
    let arguments = if factory.dialect().position_takes_needle_first() {
        vec![value.clone(), instance.clone()]
    } else {
        vec![instance.clone(), value.clone()]
    };
    factory.builtin(BuiltinFunction::Position, arguments, ValueType::Int32, None)
}
