//! The migrations history table contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::lock::DatabaseLock;
use crate::error::Result;

/// Default name of the history table.
pub const DEFAULT_TABLE_NAME: &str = "__EFMigrationsHistory";

/// An applied migration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HistoryRow {
    pub migration_id: String,
    pub product_version: String,
}

impl HistoryRow {
    pub fn new(migration_id: impl Into<String>, product_version: impl Into<String>) -> Self {
        Self {
            migration_id: migration_id.into(),
            product_version: product_version.into(),
        }
    }
}

/// When a migrations lock is released by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReleaseBehavior {
    /// Held until released or the connection closes.
    Connection,
    /// Released when the enclosing transaction ends.
    Transaction,
    /// Only released explicitly.
    Explicit,
}

/// Reads and writes the history table.
///
/// The `get_*_script` functions are pure: identical input gives
/// byte-identical output.
pub trait HistoryRepository {
    fn exists(&self) -> Result<bool>;

    fn create(&self) -> Result<()>;

    /// Create the table unless it already exists. Returns whether it was
    /// created.
    fn create_if_not_exists(&self) -> Result<bool>;

    /// Applied migrations ordered by id; empty when the table is missing.
    fn get_applied_migrations(&self) -> Result<Vec<HistoryRow>>;

    fn acquire_database_lock(&self) -> Result<DatabaseLock>;

    fn lock_release_behavior(&self) -> LockReleaseBehavior;

    fn get_create_script(&self) -> String;

    fn get_create_if_not_exists_script(&self) -> String;

    fn get_insert_script(&self, row: &HistoryRow) -> String;

    fn get_delete_script(&self, migration_id: &str) -> String;

    fn get_begin_if_not_exists_script(&self, migration_id: &str) -> String;

    fn get_begin_if_exists_script(&self, migration_id: &str) -> String;

    fn get_end_if_script(&self) -> String;
}

/// Async variants of the operations in [`HistoryRepository`] that touch the
/// database.
#[async_trait]
pub trait AsyncHistoryRepository: HistoryRepository + Send + Sync {
    async fn exists_async(&self) -> Result<bool>;

    async fn create_async(&self) -> Result<()>;

    async fn create_if_not_exists_async(&self) -> Result<bool>;

    async fn get_applied_migrations_async(&self) -> Result<Vec<HistoryRow>>;

    async fn acquire_database_lock_async(&self) -> Result<DatabaseLock>;
}
