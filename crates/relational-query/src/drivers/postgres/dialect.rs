//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific SQL syntax for identifier quoting, parameter
//! placeholders, paging, built-in functions and history table scripting.

use sha2::{Digest, Sha256};

use crate::core::identifier::delimit_identifier;
use crate::core::traits::{BuiltinFunction, DatePart, Dialect, FunctionShape, PagingStyle};

/// PostgreSQL dialect implementation.
///
/// Implements the Strategy pattern for SQL syntax differences.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

/// Advisory lock key for a named resource: the first 8 bytes of its SHA-256
/// digest, read as a big-endian signed integer.
pub fn advisory_lock_key(resource: &str) -> i64 {
    let digest = Sha256::digest(resource.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        delimit_identifier(name, '"', '"')
    }

    fn param_placeholder(&self, index: usize, _name: &str) -> String {
        format!("${}", index)
    }

    fn concat_operator(&self) -> &'static str {
        "||"
    }

    fn function(&self, function: BuiltinFunction) -> FunctionShape {
        match function {
            BuiltinFunction::Upper => FunctionShape::call("upper"),
            BuiltinFunction::Lower => FunctionShape::call("lower"),
            BuiltinFunction::Trim => FunctionShape::call("btrim"),
            BuiltinFunction::TrimStart => FunctionShape::call("ltrim"),
            BuiltinFunction::TrimEnd => FunctionShape::call("rtrim"),
            BuiltinFunction::Length => FunctionShape::call("length"),
            BuiltinFunction::Position => FunctionShape::call("strpos"),
            BuiltinFunction::Substring => FunctionShape::call("substr"),
            BuiltinFunction::Left => FunctionShape::call("left"),
            BuiltinFunction::Right => FunctionShape::call("right"),
            BuiltinFunction::Replace => FunctionShape::call("replace"),
            BuiltinFunction::Abs => FunctionShape::call("abs"),
            BuiltinFunction::Ceiling => FunctionShape::call("ceil"),
            BuiltinFunction::Floor => FunctionShape::call("floor"),
            BuiltinFunction::Round => FunctionShape::call("round"),
            BuiltinFunction::Power => FunctionShape::call("power"),
            BuiltinFunction::Sqrt => FunctionShape::call("sqrt"),
            BuiltinFunction::Greatest => FunctionShape::call("GREATEST"),
            BuiltinFunction::Least => FunctionShape::call("LEAST"),
            BuiltinFunction::Now => FunctionShape::niladic("LOCALTIMESTAMP"),
            BuiltinFunction::UtcNow => FunctionShape::call("now"),
            BuiltinFunction::DatePart => FunctionShape::call("date_part"),
            BuiltinFunction::Count | BuiltinFunction::LongCount => FunctionShape::call("COUNT"),
            BuiltinFunction::Sum => FunctionShape::call("SUM"),
            BuiltinFunction::Avg => FunctionShape::call("AVG"),
            BuiltinFunction::Min => FunctionShape::call("MIN"),
            BuiltinFunction::Max => FunctionShape::call("MAX"),
            BuiltinFunction::Coalesce => FunctionShape::call("COALESCE"),
        }
    }

    fn date_part(&self, part: DatePart) -> String {
        format!("'{}'", part.as_str())
    }

    fn paging_style(&self) -> PagingStyle {
        PagingStyle::LimitOffset
    }

    fn table_exists_sql(&self, schema: Option<&str>, table: &str) -> String {
        let schema_filter = match schema {
            Some(schema) => format!("n.nspname = {}", self.string_literal(schema)),
            None => "n.nspname = current_schema()".to_string(),
        };
        format!(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_class c JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace WHERE {} AND c.relname = {});",
            schema_filter,
            self.string_literal(table)
        )
    }

    fn create_table_if_not_exists(
        &self,
        _schema: Option<&str>,
        _table: &str,
        create_statement: &str,
    ) -> String {
        match create_statement.strip_prefix("CREATE TABLE ") {
            Some(rest) => format!("CREATE TABLE IF NOT EXISTS {}", rest),
            None => create_statement.to_string(),
        }
    }

    fn begin_if(&self, condition: &str) -> String {
        format!("DO $EF$\nBEGIN\n    IF {} THEN", condition)
    }

    fn end_if(&self) -> String {
        "    END IF;\nEND $EF$;".to_string()
    }

    fn acquire_lock_sql(&self, resource: &str) -> String {
        format!("SELECT pg_advisory_lock({});", advisory_lock_key(resource))
    }

    fn release_lock_sql(&self, resource: &str) -> String {
        format!("SELECT pg_advisory_unlock({});", advisory_lock_key(resource))
    }
}
