//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::drivers::canonical_provider_name;
use crate::error::{QueryError, Result};
use crate::execution::{DefaultTransientErrorDetector, ExecutionStrategy, RetryPolicy};
use crate::migrations::HistoryRepositoryOptions;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Canonical name of the configured provider.
    pub fn provider_name(&self) -> Result<&'static str> {
        canonical_provider_name(&self.provider)
            .ok_or_else(|| QueryError::Config(format!("Unknown provider: '{}'", self.provider)))
    }

    /// Execution strategy with the configured policy and extra transient codes.
    pub fn execution_strategy(&self) -> Result<ExecutionStrategy> {
        let detector = DefaultTransientErrorDetector::for_provider(self.provider_name()?)
            .with_additional_codes(self.retry.additional_error_codes.iter().cloned());
        ExecutionStrategy::new(self.retry.to_policy()?, Arc::new(detector))
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(self.max_retry_count, self.max_delay_ms)
    }
}

impl MigrationsConfig {
    pub fn history_options(&self) -> HistoryRepositoryOptions {
        HistoryRepositoryOptions {
            table_name: self.history_table.clone(),
            schema: self.schema.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::TransientErrorDetector;
    use std::time::Duration;

    #[test]
    fn test_from_yaml_with_defaults() {
        let config = Config::from_yaml("provider: sqlserver\n").unwrap();
        assert_eq!(config.provider_name().unwrap(), "mssql");
        assert_eq!(config.retry.max_retry_count, 6);
        assert_eq!(config.migrations.history_table, "__EFMigrationsHistory");
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r#"
provider: postgres
retry:
  max_retry_count: 3
  max_delay_ms: 2000
  additional_error_codes: ["XX000"]
migrations:
  history_table: migrations_history
  schema: ops
"#;
        let config = Config::from_yaml(yaml).unwrap();

        let policy = config.retry.to_policy().unwrap();
        assert_eq!(policy.max_retry_count, 3);
        assert_eq!(policy.max_delay, Duration::from_secs(2));

        let options = config.migrations.history_options();
        assert_eq!(options.table_name, "migrations_history");
        assert_eq!(options.schema.as_deref(), Some("ops"));

        let strategy = config.execution_strategy().unwrap();
        assert!(strategy.should_retry_on(&QueryError::database("internal", Some("XX000"))));
        assert!(strategy.should_retry_on(&QueryError::database("deadlock", Some("40P01"))));
    }

    #[test]
    fn test_negative_retry_count_rejected() {
        let err = Config::from_yaml("retry:\n  max_retry_count: -2\n").unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml("provider: [unclosed").unwrap_err();
        assert!(matches!(err, QueryError::Yaml(_)));
    }

    #[test]
    fn test_hash_is_stable() {
        let a = Config::default();
        let mut b = Config::default();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);

        b.retry.max_retry_count = 1;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_detector_without_extra_codes() {
        let detector = DefaultTransientErrorDetector::for_provider("mssql");
        assert!(!detector.should_retry_on(&QueryError::database("internal", Some("XX000"))));
    }
}
