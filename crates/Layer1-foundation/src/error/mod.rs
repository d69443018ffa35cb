//! Error types for RelayCode
//!
//! All errors are managed centrally here.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// RelayCode error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Remote agent service
    // ========================================================================
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("API error: {service} - {message}")]
    Api { service: String, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // ========================================================================
    // Task / session
    // ========================================================================
    #[error("Task error: {0}")]
    Task(String),

    #[error("Duplicate task: {0}")]
    DuplicateTask(String),

    #[error("Stream error: {0}")]
    Stream(String),

    // ========================================================================
    // Execution
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // General
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // External error conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // Misc
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check whether the error is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::RateLimited(_) | Error::Http(_) | Error::Remote(_)
        )
    }

    /// Check whether the error should be shown to the client as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::InvalidInput(_)
                | Error::DuplicateTask(_)
                | Error::Cancelled
        )
    }

    /// API error constructor helper
    pub fn api(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            service: service.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From implementations (extra conversions)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
