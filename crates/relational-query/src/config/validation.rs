//! Configuration validation.

use super::Config;
use crate::core::identifier::validate_identifier;
use crate::drivers::canonical_provider_name;
use crate::error::{QueryError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if canonical_provider_name(&config.provider).is_none() {
        return Err(QueryError::Config(format!(
            "provider must be 'postgres' or 'mssql', got '{}'",
            config.provider
        )));
    }

    if config.retry.max_retry_count < 0 {
        return Err(QueryError::Config(format!(
            "retry.max_retry_count must not be negative, got {}",
            config.retry.max_retry_count
        )));
    }
    if config.retry.max_delay_ms < 0 {
        return Err(QueryError::Config(format!(
            "retry.max_delay_ms must not be negative, got {}",
            config.retry.max_delay_ms
        )));
    }
    if config.retry.additional_error_codes.iter().any(|c| c.trim().is_empty()) {
        return Err(QueryError::Config(
            "retry.additional_error_codes must not contain empty codes".into(),
        ));
    }

    validate_identifier(&config.migrations.history_table).map_err(|e| {
        QueryError::Config(format!("migrations.history_table: {}", e))
    })?;
    if let Some(schema) = &config.migrations.schema {
        validate_identifier(schema)
            .map_err(|e| QueryError::Config(format!("migrations.schema: {}", e)))?;
    }

    Ok(())
}
