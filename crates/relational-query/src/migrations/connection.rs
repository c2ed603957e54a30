//! Command execution collaborator used by the history repository.

use async_trait::async_trait;

use crate::core::value::SqlValue;
use crate::error::Result;

/// One row returned by [`MigrationConnection::query_rows`].
pub type Row = Vec<SqlValue>;

/// Executes raw SQL against the migrations database.
///
/// The history repository only builds SQL; running it is delegated here so
/// the repository stays independent of any particular driver.
#[async_trait]
pub trait MigrationConnection: Send + Sync {
    /// Execute a statement, returning the number of affected rows.
    fn execute_non_query(&self, sql: &str) -> Result<u64>;

    /// Execute a query and return the first column of the first row,
    /// [`SqlValue::Null`] when there is none.
    fn execute_scalar(&self, sql: &str) -> Result<SqlValue>;

    fn query_rows(&self, sql: &str) -> Result<Vec<Row>>;

    async fn execute_non_query_async(&self, sql: &str) -> Result<u64>;

    async fn execute_scalar_async(&self, sql: &str) -> Result<SqlValue>;

    async fn query_rows_async(&self, sql: &str) -> Result<Vec<Row>>;
}
