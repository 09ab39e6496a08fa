//! Error types for versionops-discovery

use std::time::Duration;

use thiserror::Error;

/// Errors a discovery plugin can end with.
///
/// Never fatal to a cycle; the engine records them per plugin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Required tool or database missing on this host
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Discovery command exited non-zero
    #[error("command failed: {status} - {message}")]
    CommandFailed {
        /// Exit status
        status: i32,
        /// Error message
        message: String,
    },

    /// Executor error (spawn, I/O)
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// Failed to parse command output
    #[error("parse error: {0}")]
    ParseError(String),

    /// Invalid version regex
    #[error("invalid version pattern: {0}")]
    InvalidPattern(String),

    /// Plugin exceeded its time budget
    #[error("plugin timed out after {0:?}")]
    Timeout(Duration),

    /// Plugin panicked
    #[error("plugin panicked: {0}")]
    Panicked(String),

    /// Abandoned because the agent is shutting down
    #[error("discovery cancelled")]
    Cancelled,
}

impl DiscoveryError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, DiscoveryError::Timeout(_))
    }
}

impl From<versionops_exec::ExecError> for DiscoveryError {
    fn from(err: versionops_exec::ExecError) -> Self {
        match err {
            versionops_exec::ExecError::Timeout { timeout } => DiscoveryError::Timeout(timeout),
            other => DiscoveryError::ExecutionError(other.to_string()),
        }
    }
}
