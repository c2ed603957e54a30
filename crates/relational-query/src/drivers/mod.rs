//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`mssql`]: Microsoft SQL Server dialect
//! - [`postgres`]: PostgreSQL dialect
//!
//! Store type mappings for each engine live in [`crate::typemap`]; the
//! [`ProviderCatalog`](crate::core::ProviderCatalog) pairs them with the
//! dialects registered here.
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` with a `Dialect` implementation
//! 2. Add a `ProviderTypeMappings` implementation under `typemap/`
//! 3. Add an enum variant to `DialectImpl`
//! 4. Register both in `ProviderCatalog::with_builtins()`

pub mod mssql;
pub mod postgres;

pub use mssql::MssqlDialect;
pub use postgres::PostgresDialect;

use crate::core::traits::{BuiltinFunction, DatePart, Dialect, FunctionShape, PagingStyle};
use crate::error::{QueryError, Result};

/// Enum-based static dispatch for dialects.
///
/// The compiler generates a match statement instead of using vtable
/// dispatch.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mssql(MssqlDialect),
    Postgres(PostgresDialect),
}

macro_rules! dispatch {
    ($self:ident, $d:ident => $call:expr) => {
        match $self {
            DialectImpl::Mssql($d) => $call,
            DialectImpl::Postgres($d) => $call,
        }
    };
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        dispatch!(self, d => d.name())
    }

    fn quote_ident(&self, name: &str) -> String {
        dispatch!(self, d => d.quote_ident(name))
    }

    fn param_placeholder(&self, index: usize, name: &str) -> String {
        dispatch!(self, d => d.param_placeholder(index, name))
    }

    fn concat_operator(&self) -> &'static str {
        dispatch!(self, d => d.concat_operator())
    }

    fn function(&self, function: BuiltinFunction) -> FunctionShape {
        dispatch!(self, d => d.function(function))
    }

    fn date_part(&self, part: DatePart) -> String {
        dispatch!(self, d => d.date_part(part))
    }

    fn position_takes_needle_first(&self) -> bool {
        dispatch!(self, d => d.position_takes_needle_first())
    }

    fn empty_search_not_found(&self) -> bool {
        dispatch!(self, d => d.empty_search_not_found())
    }

    fn round_requires_length(&self) -> bool {
        dispatch!(self, d => d.round_requires_length())
    }

    fn requires_bool_comparison(&self) -> bool {
        dispatch!(self, d => d.requires_bool_comparison())
    }

    fn paging_style(&self) -> PagingStyle {
        dispatch!(self, d => d.paging_style())
    }

    fn batch_terminator(&self) -> &'static str {
        dispatch!(self, d => d.batch_terminator())
    }

    fn string_literal(&self, value: &str) -> String {
        dispatch!(self, d => d.string_literal(value))
    }

    fn table_exists_sql(&self, schema: Option<&str>, table: &str) -> String {
        dispatch!(self, d => d.table_exists_sql(schema, table))
    }

    fn create_table_if_not_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        create_statement: &str,
    ) -> String {
        dispatch!(self, d => d.create_table_if_not_exists(schema, table, create_statement))
    }

    fn begin_if(&self, condition: &str) -> String {
        dispatch!(self, d => d.begin_if(condition))
    }

    fn end_if(&self) -> String {
        dispatch!(self, d => d.end_if())
    }

    fn acquire_lock_sql(&self, resource: &str) -> String {
        dispatch!(self, d => d.acquire_lock_sql(resource))
    }

    fn release_lock_sql(&self, resource: &str) -> String {
        dispatch!(self, d => d.release_lock_sql(resource))
    }
}

impl DialectImpl {
    /// Create a dialect implementation from a database type string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database type is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match canonical_provider_name(db_type) {
            Some("mssql") => Ok(DialectImpl::Mssql(MssqlDialect::new())),
            Some("postgres") => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            _ => Err(QueryError::Config(format!(
                "Unknown database type: '{}'. Supported types: mssql, postgres",
                db_type
            ))),
        }
    }
}

/// Canonical provider name for a database type string and its aliases.
pub fn canonical_provider_name(db_type: &str) -> Option<&'static str> {
    match db_type.to_lowercase().as_str() {
        "mssql" | "sqlserver" | "sql_server" => Some("mssql"),
        "postgres" | "postgresql" | "pg" => Some("postgres"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_impl_from_db_type() {
        let mssql = DialectImpl::from_db_type("mssql").unwrap();
        assert_eq!(mssql.name(), "mssql");

        let postgres = DialectImpl::from_db_type("postgres").unwrap();
        assert_eq!(postgres.name(), "postgres");

        // Alternative names
        assert!(DialectImpl::from_db_type("sqlserver").is_ok());
        assert!(DialectImpl::from_db_type("PostgreSQL").is_ok());
        assert!(DialectImpl::from_db_type("pg").is_ok());

        assert!(DialectImpl::from_db_type("unknown").is_err());
    }

    #[test]
    fn test_dialect_impl_postgres() {
        let dialect = DialectImpl::Postgres(PostgresDialect::new());
        assert_eq!(dialect.quote_ident("table"), "\"table\"");
        assert_eq!(dialect.param_placeholder(1, "p"), "$1");
        assert_eq!(dialect.paging_style(), PagingStyle::LimitOffset);
        assert_eq!(dialect.concat_operator(), "||");
    }

    #[test]
    fn test_dialect_impl_mssql() {
        let dialect = DialectImpl::Mssql(MssqlDialect::new());
        assert_eq!(dialect.quote_ident("table"), "[table]");
        assert_eq!(dialect.param_placeholder(1, "p"), "@p");
        assert_eq!(dialect.batch_terminator(), "GO");
        assert!(dialect.requires_bool_comparison());
    }
}
