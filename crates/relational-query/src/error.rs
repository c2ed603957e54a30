//! Error types for query translation, SQL generation and execution.

use thiserror::Error;

/// Main error type for the translation pipeline and its collaborators.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Configuration error (invalid YAML, bad values, unknown provider, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A function node was built with a nullability flag list of the wrong length
    #[error(
        "Inconsistent argument count for function {function}: {arguments} arguments but {flags} nullability propagation flags"
    )]
    InconsistentArgumentCount {
        function: String,
        arguments: usize,
        flags: usize,
    },

    /// Parameter index outside `[0, count)`
    #[error("Parameter index {index} is out of range (command has {count} parameters)")]
    ParameterIndexOutOfRange { index: usize, count: usize },

    /// A parameter with the same invariant name was already added to the command
    #[error("Parameter {0} has already been added to this command")]
    DuplicateParameter(String),

    /// Retry policy values that cannot be honored
    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    /// Operation that the translation layer deliberately does not support
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// A query construct could not be translated to SQL
    #[error("Translation of {construct} failed: {message}")]
    Translation { construct: String, message: String },

    /// Error reported by the command execution collaborator
    #[error("Database error{}: {message}", .code.as_ref().map(|c| format!(" [{}]", c)).unwrap_or_default())]
    Database {
        message: String,
        code: Option<String>,
    },

    /// The execution strategy gave up after repeated transient failures
    #[error("Maximum number of retries ({retries}) exceeded while executing database operations")]
    RetryLimitExceeded {
        retries: usize,
        #[source]
        source: Box<QueryError>,
        /// Earlier transient errors, oldest first. `source` is the last one.
        history: Vec<QueryError>,
    },

    /// A retrying strategy was started inside a caller-managed transaction
    #[error(
        "The configured execution strategy does not support user-initiated transactions. \
         Run the whole transaction, including its begin and commit, as one retriable unit of work."
    )]
    TransactionConflict,

    /// Operation was cancelled through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    /// Create a Translation error for a method, function or node.
    pub fn translation(construct: impl Into<String>, message: impl Into<String>) -> Self {
        QueryError::Translation {
            construct: construct.into(),
            message: message.into(),
        }
    }

    /// Create a Database error with an optional provider error code.
    pub fn database(message: impl Into<String>, code: Option<&str>) -> Self {
        QueryError::Database {
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    /// Provider error code, if this is a database error.
    pub fn database_code(&self) -> Option<&str> {
        match self {
            QueryError::Database { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether this error is the cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryError::Cancelled)
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            QueryError::Config(_)
            | QueryError::InvalidRetryPolicy(_)
            | QueryError::Yaml(_)
            | QueryError::Json(_) => 2,
            QueryError::Translation { .. } | QueryError::Unsupported(_) => 3,
            QueryError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Retry exhaustion keeps every transient failure, not just the last
        if let QueryError::RetryLimitExceeded { history, .. } = self {
            for (attempt, err) in history.iter().enumerate() {
                output.push_str(&format!("\nAttempt {} failed:\n  {}", attempt + 1, err));
            }
        }

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
