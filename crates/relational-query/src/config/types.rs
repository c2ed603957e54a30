//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::migrations::DEFAULT_TABLE_NAME;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Provider name or alias ("postgres", "pg", "mssql", "sqlserver", ...).
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Execution strategy retry settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Migrations history table settings.
    #[serde(default)]
    pub migrations: MigrationsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            retry: RetryConfig::default(),
            migrations: MigrationsConfig::default(),
        }
    }
}

/// Retry settings of the execution strategy.
///
/// Counts and delays are signed so that negative values in YAML are reported
/// as configuration errors rather than parse errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Transient failures tolerated before giving up (default: 6).
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: i64,

    /// Cap on a single backoff delay in milliseconds (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: i64,

    /// Provider error codes treated as transient in addition to the
    /// built-in ones.
    #[serde(default)]
    pub additional_error_codes: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            max_delay_ms: default_max_delay_ms(),
            additional_error_codes: Vec::new(),
        }
    }
}

/// Migrations history table location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationsConfig {
    /// History table name (default: `__EFMigrationsHistory`).
    #[serde(default = "default_history_table")]
    pub history_table: String,

    /// Schema of the history table; the connection default when unset.
    #[serde(default)]
    pub schema: Option<String>,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            history_table: default_history_table(),
            schema: None,
        }
    }
}

fn default_provider() -> String {
    "postgres".to_string()
}

fn default_max_retry_count() -> i64 {
    6
}

fn default_max_delay_ms() -> i64 {
    30_000
}

fn default_history_table() -> String {
    DEFAULT_TABLE_NAME.to_string()
}
