//! Error types for Tether
//!
//! One error enum covers every layer of the sync core. The variants follow the
//! failure classes the library distinguishes:
//! - transient remote failures (`NotFound` while a session warms up, `Http` 5xx)
//! - malformed local data, which storage degrades to "absent" before it ever
//!   reaches a caller
//! - `Timeout` from the polling waiter
//! - `Batch`, the aggregate raised by the batch executor
//! - `InvalidInput` for programmer errors such as an empty session id

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Tether operations
pub type TetherResult<T> = Result<T, TetherError>;

/// One failed item inside a [`TetherError::Batch`]
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// Position of the item in the input
    pub index: usize,
    /// Error the item produced
    pub error: TetherError,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item {}: {}", self.index, self.error)
    }
}

/// Main error type for Tether
#[derive(Error, Debug, Clone)]
pub enum TetherError {
    /// Resource not found (also how the remote reports a session that is not visible yet)
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        resource_type: Option<String>,
    },

    /// Remote request errors
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        status_code: Option<u16>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Predicate not satisfied within the time budget
    #[error("Timed out after {}ms: {message}", .elapsed.as_millis())]
    Timeout { message: String, elapsed: Duration },

    /// Several items of a batch failed
    #[error("{} of {total} batch items failed", .failures.len())]
    Batch {
        total: usize,
        failures: Vec<BatchFailure>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Operation was cancelled
    #[error("Operation was cancelled")]
    Cancelled,

    /// Generic error
    #[error("Error: {message}")]
    Other { message: String },
}

impl TetherError {
    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
        }
    }

    /// Create a not-found error for a typed resource
    pub fn not_found_resource(resource_type: impl Into<String>, id: impl AsRef<str>) -> Self {
        let resource_type = resource_type.into();
        Self::NotFound {
            message: format!("{} '{}'", resource_type, id.as_ref()),
            resource_type: Some(resource_type),
        }
    }

    /// Create an HTTP error
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create an HTTP error with a status code
    pub fn http_status(status_code: u16, message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
        }
    }

    /// Create an IO error bound to a path
    pub fn io_at(message: impl Into<String>, path: impl AsRef<std::path::Path>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.as_ref().display().to_string()),
        }
    }

    /// Create a JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error for a specific field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            message: message.into(),
            elapsed,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "TETHER_NOT_FOUND",
            Self::Http { .. } => "TETHER_HTTP",
            Self::Io { .. } => "TETHER_IO",
            Self::Json { .. } => "TETHER_JSON",
            Self::InvalidInput { .. } => "TETHER_INVALID_INPUT",
            Self::Timeout { .. } => "TETHER_TIMEOUT",
            Self::Batch { .. } => "TETHER_BATCH",
            Self::Config { .. } => "TETHER_CONFIG",
            Self::Cancelled => "TETHER_CANCELLED",
            Self::Other { .. } => "TETHER_OTHER",
        }
    }

    /// Whether this is the remote "not found / not yet visible" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is a timeout from the polling waiter
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Transient remote failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Http { status_code, .. } => match status_code {
                Some(code) => *code == 429 || *code >= 500,
                None => true,
            },
            _ => false,
        }
    }

    /// Individual causes of a batch failure (empty for other variants)
    pub fn causes(&self) -> &[BatchFailure] {
        match self {
            Self::Batch { failures, .. } => failures,
            _ => &[],
        }
    }
}

impl From<std::io::Error> for TetherError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}
