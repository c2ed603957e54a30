//! `DateTime` static members and component accessors.

use crate::core::traits::{BuiltinFunction, DatePart};
use crate::core::types::ValueType;
use crate::error::Result;
use crate::expressions::SqlExpr;
use crate::query::expression::MethodInfo;
use crate::query::factory::SqlExpressionFactory;

use super::MethodCallTranslator;

#[derive(Debug, Default)]
pub struct DateTimeMemberTranslator;

impl MethodCallTranslator for DateTimeMemberTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> Result<Option<SqlExpr>> {
        if !matches!(method.declaring_type.as_str(), "DateTime" | "DateTimeOffset")
            || !arguments.is_empty()
        {
            return Ok(None);
        }

        let Some(instance) = instance else {
            let function = match method.name.as_str() {
                "Now" => BuiltinFunction::Now,
                "UtcNow" => BuiltinFunction::UtcNow,
                _ => return Ok(None),
            };
            let value_type = if method.declaring_type == "DateTimeOffset" {
                ValueType::DateTimeOffset
            } else {
                ValueType::DateTime
            };
            return factory.builtin(function, vec![], value_type, None).map(Some);
        };

        let part = match method.name.as_str() {
            "Year" => DatePart::Year,
            "Month" => DatePart::Month,
            "Day" => DatePart::Day,
            "Hour" => DatePart::Hour,
            "Minute" => DatePart::Minute,
            "Second" => DatePart::Second,
            _ => return Ok(None),
        };
        let part = SqlExpr::fragment(factory.dialect().date_part(part));
        factory
            .builtin(
                BuiltinFunction::DatePart,
                vec![part, instance.clone()],
                ValueType::Int32,
                None,
            )
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{column, mssql, postgres};
    use super::*;

    fn member(factory: &SqlExpressionFactory, instance: Option<&SqlExpr>, name: &str) -> Option<SqlExpr> {
        DateTimeMemberTranslator
            .translate(instance, &MethodInfo::new("DateTime", name), &[], factory)
            .unwrap()
    }

    #[test]
    fn test_now_spellings() {
        assert_eq!(member(&postgres(), None, "Now").unwrap().to_string(), "LOCALTIMESTAMP");
        assert_eq!(member(&postgres(), None, "UtcNow").unwrap().to_string(), "now()");
        assert_eq!(member(&mssql(), None, "Now").unwrap().to_string(), "GETDATE()");
        assert_eq!(member(&mssql(), None, "UtcNow").unwrap().to_string(), "GETUTCDATE()");
    }

    #[test]
    fn test_date_parts() {
        let created = column("Created", ValueType::DateTime, "timestamp");
        let pg = member(&postgres(), Some(&created), "Year").unwrap();
        assert_eq!(pg.to_string(), "date_part('year', b.Created)");
        assert_eq!(*pg.value_type(), ValueType::Int32);

        let ms = member(&mssql(), Some(&created), "Month").unwrap();
        assert_eq!(ms.to_string(), "DATEPART(month, b.Created)");
    }

    #[test]
    fn test_unknown_member() {
        assert!(member(&postgres(), None, "Today").is_none());
    }
}
