//! Error types for the versionops client

use thiserror::Error;

/// Errors from plain backend requests (application configs)
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// API returned an error status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
    },
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Network-level failure of a single delivery request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response within the request timeout
    #[error("request timed out")]
    Timeout,

    /// Connection refused, reset or DNS failure
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport failure
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Why a report attempt ended without delivery
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// 401/403; not retried until the next cycle
    #[error("authentication rejected by backend ({status})")]
    Authentication {
        /// HTTP status code
        status: u16,
    },

    /// Any other 4xx; the payload will not be accepted as is
    #[error("report rejected by backend ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        message: String,
    },

    /// Retryable failures until the attempt budget ran out
    #[error("gave up after {attempts} requests: {last}")]
    Exhausted {
        /// Requests issued
        attempts: u32,
        /// Last failure seen
        last: String,
    },

    /// Shutdown requested while waiting to retry
    #[error("report cancelled")]
    Cancelled,

    /// Snapshot could not be encoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ReportError {
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, ReportError::Authentication { .. })
    }
}
