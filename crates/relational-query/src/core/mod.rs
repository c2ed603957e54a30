//! Core abstractions shared by every provider.
//!
//! - [`types`]: logical value types of the query language
//! - [`value`]: SQL values carried by constants and parameters
//! - [`identifier`]: identifier validation and quoting helpers
//! - [`traits`]: the [`Dialect`] strategy implemented by each provider
//! - [`catalog`]: provider registry and session factory
//!
//! # Design Patterns
//!
//! - **Abstract Factory**: `ProviderCatalog` creates sessions wired with one
//!   provider's dialect, type mappings and plugins
//! - **Strategy**: `Dialect` provides interchangeable SQL spellings

pub mod catalog;
pub mod identifier;
pub mod traits;
pub mod types;
pub mod value;

pub use catalog::{AggregatePluginFactory, MethodPluginFactory, ProviderCatalog};
pub use traits::{BuiltinFunction, DatePart, Dialect, FunctionShape, PagingStyle};
pub use types::ValueType;
pub use value::SqlValue;
