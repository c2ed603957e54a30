//! Migrations history table access.
//!
//! [`HistoryRepository`] and [`AsyncHistoryRepository`] describe the
//! contract; [`RelationalHistoryRepository`] implements it for any provider
//! by rendering SQL through the provider's dialect and type mappings and
//! running it on a [`MigrationConnection`].

pub mod connection;
pub mod history;
pub mod lock;
pub mod relational;

pub use connection::{MigrationConnection, Row};
pub use history::{
    AsyncHistoryRepository, HistoryRepository, HistoryRow, LockReleaseBehavior, DEFAULT_TABLE_NAME,
};
pub use lock::DatabaseLock;
pub use relational::{HistoryRepositoryOptions, RelationalHistoryRepository};
