//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`advisory_lock_key`]: key used for the migrations advisory lock

mod dialect;

pub use dialect::{advisory_lock_key, PostgresDialect};
