//! Remote-service-specific error types
//!
//! `RemoteError` carries the detail needed for retry decisions; conversion
//! into `relay_foundation::Error` is supported for the layers above.

use crate::retry::{RetryClassification, RetryableError};
use relay_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors that can occur while talking to the remote agent service
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    /// API token is missing or invalid
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// Server error (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Network error (connection failed, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid request (bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Task does not exist on the remote side
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// JSON parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Client is missing credentials
    #[error("Remote service not configured: {0}")]
    NotConfigured(String),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RetryableError for RemoteError {
    fn classify(&self) -> RetryClassification {
        match self {
            RemoteError::RateLimited { retry_after_ms } => RetryClassification::RateLimited {
                retry_after_ms: *retry_after_ms,
            },

            // Transient - retry
            RemoteError::ServerError(_) | RemoteError::Network(_) => RetryClassification::Retry,

            // Everything else is permanent
            RemoteError::Authentication(_)
            | RemoteError::InvalidRequest(_)
            | RemoteError::InvalidResponse(_)
            | RemoteError::TaskNotFound(_)
            | RemoteError::ParseError(_)
            | RemoteError::NotConfigured(_)
            | RemoteError::Unknown(_) => RetryClassification::NoRetry,
        }
    }
}

impl RemoteError {
    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => RemoteError::Authentication(body.to_string()),
            429 => RemoteError::RateLimited {
                retry_after_ms: extract_retry_after(body),
            },
            400 => RemoteError::InvalidRequest(body.to_string()),
            404 => RemoteError::TaskNotFound(body.to_string()),
            500..=599 => RemoteError::ServerError(body.to_string()),
            _ => RemoteError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            RemoteError::Network(err.to_string())
        } else if err.is_decode() {
            RemoteError::ParseError(err.to_string())
        } else {
            RemoteError::Unknown(err.to_string())
        }
    }
}

/// Try to extract a retry-after hint from an error body (in milliseconds)
fn extract_retry_after(body: &str) -> Option<u64> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("error")
        .and_then(|e| e.get("retry_after"))
        .or_else(|| json.get("retry_after"))
        .and_then(|v| v.as_f64())
        .map(|secs| (secs * 1000.0) as u64)
}

// ============================================================================
// relay_foundation::Error conversion
// ============================================================================

impl From<RemoteError> for FoundationError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Authentication(msg) => {
                FoundationError::api("agent", format!("Authentication failed: {}", msg))
            }
            RemoteError::RateLimited { retry_after_ms } => FoundationError::RateLimited(
                retry_after_ms
                    .map(|ms| format!("Retry after {}ms", ms))
                    .unwrap_or_else(|| "Rate limited".to_string()),
            ),
            RemoteError::ServerError(msg) => {
                FoundationError::api("agent", format!("Server error: {}", msg))
            }
            RemoteError::Network(msg) => FoundationError::Http(msg),
            RemoteError::InvalidRequest(msg) => FoundationError::InvalidInput(msg),
            RemoteError::InvalidResponse(msg) => {
                FoundationError::Remote(format!("Invalid response: {}", msg))
            }
            RemoteError::TaskNotFound(msg) => FoundationError::NotFound(msg),
            RemoteError::ParseError(msg) => {
                FoundationError::Remote(format!("Parse error: {}", msg))
            }
            RemoteError::NotConfigured(msg) => FoundationError::Config(msg),
            RemoteError::Unknown(msg) => FoundationError::Remote(msg),
        }
    }
}
