//! MSSQL SQL dialect (Strategy pattern).
//!
//! Provides MSSQL-specific SQL syntax for identifier quoting, parameter
//! placeholders, paging, built-in functions and history table scripting.

use crate::core::identifier::{delimit_identifier, escape_string_literal};
use crate::core::traits::{BuiltinFunction, DatePart, Dialect, FunctionShape, PagingStyle};

/// Microsoft SQL Server dialect implementation.
///
/// Implements the Strategy pattern for SQL syntax differences.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Create a new MSSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn quote_ident(&self, name: &str) -> String {
        delimit_identifier(name, '[', ']')
    }

    fn param_placeholder(&self, _index: usize, name: &str) -> String {
        format!("@{}", name)
    }

    fn concat_operator(&self) -> &'static str {
        "+"
    }

    fn function(&self, function: BuiltinFunction) -> FunctionShape {
        match function {
            BuiltinFunction::Upper => FunctionShape::call("UPPER"),
            BuiltinFunction::Lower => FunctionShape::call("LOWER"),
            BuiltinFunction::Trim => FunctionShape::call("TRIM"),
            BuiltinFunction::TrimStart => FunctionShape::call("LTRIM"),
            BuiltinFunction::TrimEnd => FunctionShape::call("RTRIM"),
            BuiltinFunction::Length => FunctionShape::call("LEN"),
            BuiltinFunction::Position => FunctionShape::call("CHARINDEX"),
            BuiltinFunction::Substring => FunctionShape::call("SUBSTRING"),
            BuiltinFunction::Left => FunctionShape::call("LEFT"),
            BuiltinFunction::Right => FunctionShape::call("RIGHT"),
            BuiltinFunction::Replace => FunctionShape::call("REPLACE"),
            BuiltinFunction::Abs => FunctionShape::call("ABS"),
            BuiltinFunction::Ceiling => FunctionShape::call("CEILING"),
            BuiltinFunction::Floor => FunctionShape::call("FLOOR"),
            BuiltinFunction::Round => FunctionShape::call("ROUND"),
            BuiltinFunction::Power => FunctionShape::call("POWER"),
            BuiltinFunction::Sqrt => FunctionShape::call("SQRT"),
            BuiltinFunction::Greatest => FunctionShape::call("GREATEST"),
            BuiltinFunction::Least => FunctionShape::call("LEAST"),
            BuiltinFunction::Now => FunctionShape::call("GETDATE"),
            BuiltinFunction::UtcNow => FunctionShape::call("GETUTCDATE"),
            BuiltinFunction::DatePart => FunctionShape::call("DATEPART"),
            BuiltinFunction::Count => FunctionShape::call("COUNT"),
            BuiltinFunction::LongCount => FunctionShape::call("COUNT_BIG"),
            BuiltinFunction::Sum => FunctionShape::call("SUM"),
            BuiltinFunction::Avg => FunctionShape::call("AVG"),
            BuiltinFunction::Min => FunctionShape::call("MIN"),
            BuiltinFunction::Max => FunctionShape::call("MAX"),
            BuiltinFunction::Coalesce => FunctionShape::call("COALESCE"),
        }
    }

    fn date_part(&self, part: DatePart) -> String {
        part.as_str().to_string()
    }

    fn position_takes_needle_first(&self) -> bool {
        true
    }

    fn empty_search_not_found(&self) -> bool {
        true
    }

    fn round_requires_length(&self) -> bool {
        true
    }

    fn requires_bool_comparison(&self) -> bool {
        true
    }

    fn paging_style(&self) -> PagingStyle {
        PagingStyle::TopOffsetFetch
    }

    fn batch_terminator(&self) -> &'static str {
        "GO"
    }

    fn string_literal(&self, value: &str) -> String {
        format!("N'{}'", escape_string_literal(value))
    }

    fn table_exists_sql(&self, schema: Option<&str>, table: &str) -> String {
        format!(
            "SELECT OBJECT_ID({});",
            self.string_literal(&self.qualify(schema, table))
        )
    }

    fn create_table_if_not_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        create_statement: &str,
    ) -> String {
        let mut sql = format!(
            "IF OBJECT_ID({}) IS NULL\nBEGIN\n",
            self.string_literal(&self.qualify(schema, table))
        );
        for line in create_statement.lines() {
            if line.is_empty() {
                sql.push('\n');
            } else {
                sql.push_str("    ");
                sql.push_str(line);
                sql.push('\n');
            }
        }
        sql.push_str("END;");
        sql
    }

    fn begin_if(&self, condition: &str) -> String {
        format!("IF {}\nBEGIN", condition)
    }

    fn end_if(&self) -> String {
        "END;".to_string()
    }

    fn acquire_lock_sql(&self, resource: &str) -> String {
        format!(
            "DECLARE @result int;\nEXEC @result = sp_getapplock @Resource = {}, @LockOwner = 'Session', @LockMode = 'Exclusive';\nSELECT @result;",
            self.string_literal(resource)
        )
    }

    fn release_lock_sql(&self, resource: &str) -> String {
        format!(
            "DECLARE @result int;\nEXEC @result = sp_releaseapplock @Resource = {}, @LockOwner = 'Session';\nSELECT @result;",
            self.string_literal(resource)
        )
    }
}
