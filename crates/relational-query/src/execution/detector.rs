//! Classification of transient database errors.

use std::collections::HashSet;
use std::io;

use crate::drivers::canonical_provider_name;
use crate::error::QueryError;

/// PostgreSQL SQLSTATEs worth retrying: serialization failure, deadlock,
/// too many connections, admin shutdown, connection failures.
const POSTGRES_TRANSIENT_CODES: &[&str] = &["40001", "40P01", "53300", "57P01", "08006", "08001"];

/// SQL Server error numbers worth retrying: deadlock victim, timeout,
/// Azure SQL throttling and failover, login and transport failures.
const MSSQL_TRANSIENT_CODES: &[&str] = &[
    "1205", "-2", "40613", "40197", "40501", "49918", "4060", "233", "10053", "10054", "10060",
];

/// Decides whether a failed unit of work may succeed if retried.
pub trait TransientErrorDetector: Send + Sync {
    fn should_retry_on(&self, error: &QueryError) -> bool;
}

/// Error-code based detection for one provider.
#[derive(Debug, Clone, Default)]
pub struct DefaultTransientErrorDetector {
    codes: HashSet<String>,
}

impl DefaultTransientErrorDetector {
    /// Detector with the provider's built-in codes; unknown providers start
    /// with none.
    pub fn for_provider(provider: &str) -> Self {
        let codes: &[&str] = match canonical_provider_name(provider) {
            Some("postgres") => POSTGRES_TRANSIENT_CODES,
            Some("mssql") => MSSQL_TRANSIENT_CODES,
            _ => &[],
        };
        Self {
            codes: codes.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Also treat these codes as transient.
    pub fn with_additional_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codes.extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn is_transient_code(&self, code: &str) -> bool {
        self.codes.contains(code)
    }
}

impl TransientErrorDetector for DefaultTransientErrorDetector {
    fn should_retry_on(&self, error: &QueryError) -> bool {
        match error {
            QueryError::Database { code: Some(code), .. } => self.is_transient_code(code),
            QueryError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_codes() {
        let detector = DefaultTransientErrorDetector::for_provider("postgresql");
        assert!(detector.should_retry_on(&QueryError::database("deadlock", Some("40P01"))));
        assert!(!detector.should_retry_on(&QueryError::database("syntax", Some("42601"))));
        assert!(!detector.should_retry_on(&QueryError::database("no code", None)));
    }

    #[test]
    fn test_mssql_codes() {
        let detector = DefaultTransientErrorDetector::for_provider("mssql");
        assert!(detector.should_retry_on(&QueryError::database("victim", Some("1205"))));
        assert!(detector.should_retry_on(&QueryError::database("timeout", Some("-2"))));
        assert!(!detector.should_retry_on(&QueryError::database("pk", Some("2627"))));
    }

    #[test]
    fn test_additional_codes() {
        let detector = DefaultTransientErrorDetector::for_provider("mssql").with_additional_codes(["2627"]);
        assert!(detector.should_retry_on(&QueryError::database("pk", Some("2627"))));
    }

    #[test]
    fn test_non_database_errors() {
        let detector = DefaultTransientErrorDetector::for_provider("postgres");
        assert!(!detector.should_retry_on(&QueryError::Cancelled));
        assert!(!detector.should_retry_on(&QueryError::TransactionConflict));
        assert!(detector.should_retry_on(&QueryError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))));
    }
}
