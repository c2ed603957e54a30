//! # relational-query
//!
//! Provider-neutral query translation for relational databases.
//!
//! This library turns logical queries over a mapped model into
//! parameterized SQL for a specific provider, with support for:
//!
//! - **SQL expression trees** with visitors, printing and quoting
//! - **Type mapping** from logical types and facets to store types
//! - **Method and aggregate translators**, extensible through plugins
//! - **Command building** with indentation and parameter bookkeeping
//! - **Migrations history** scripts and operations over any dialect
//! - **Execution strategies** that retry transient failures with backoff
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use relational_query::{LogicalQuery, Model, ProviderCatalog};
//!
//! let catalog = ProviderCatalog::with_builtins();
//! let session = catalog.create_session("postgres", Arc::new(model))?;
//! let command = session.compile(&query)?;
//! println!("{}", command.command_text);
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod execution;
pub mod expressions;
pub mod migrations;
pub mod query;
pub mod storage;
pub mod typemap;

// Re-exports for convenient access
pub use crate::config::{Config, MigrationsConfig, RetryConfig};
pub use crate::core::{Dialect, ProviderCatalog, SqlValue, ValueType};
pub use crate::drivers::{DialectImpl, MssqlDialect, PostgresDialect};
pub use crate::error::{QueryError, Result};
pub use crate::execution::{
    DefaultTransientErrorDetector, Executed, ExecutionContext, ExecutionStrategy, RetryPolicy,
    TransientErrorDetector,
};
pub use crate::expressions::{ExpressionKind, SqlExpr};
pub use crate::migrations::{
    AsyncHistoryRepository, DatabaseLock, HistoryRepository, HistoryRepositoryOptions, HistoryRow,
    LockReleaseBehavior, MigrationConnection, RelationalHistoryRepository,
};
pub use crate::query::{Expression, LogicalQuery, QueryCompilationContext};
pub use crate::storage::{EntityType, Model, Property, RelationalCommand, RelationalCommandBuilder};
pub use crate::typemap::{RelationalTypeMapping, RelationalTypeMappingSource, TypeMappingInfo, TypeMappingSource};
