//! Identifier validation and literal escaping shared by every dialect.
//!
//! Identifiers (table, column and schema names) cannot be bound as command
//! parameters, so generated SQL embeds them as delimited text. Names coming
//! from configuration go through [`validate_identifier`] first.

use crate::error::{QueryError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier supplied from outside the model.
///
/// Rejects:
/// - Empty or whitespace-only identifiers
/// - Identifiers containing null bytes
/// - Identifiers exceeding maximum length
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(QueryError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(QueryError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(QueryError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Wrap `name` in `open`/`close`, doubling any embedded `close`.
///
/// ```ignore
/// assert_eq!(delimit_identifier("table]name", '[', ']'), "[table]]name]");
/// ```
pub fn delimit_identifier(name: &str, open: char, close: char) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(open);
    for c in name.chars() {
        if c == close {
            quoted.push(close);
        }
        quoted.push(c);
    }
    quoted.push(close);
    quoted
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_string_literal(value: &str) -> String {
    value.replace('\'', "''")
}
