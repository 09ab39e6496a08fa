//! Core error types for versionops-core

use std::path::PathBuf;

use thiserror::Error;

use crate::state::SchedulerState;

/// Errors that can occur in configuration and scheduling
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration missing, unreadable or invalid
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be read or written
    #[error("configuration file {path}: {source}")]
    ConfigIo {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Invalid state transition attempted
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: SchedulerState,
        /// Attempted target state
        to: SchedulerState,
    },

    /// Persisting agent state failed
    #[error(transparent)]
    State(#[from] StateError),
}

/// Errors from the state store
#[derive(Error, Debug)]
pub enum StateError {
    /// Reading or replacing the blob failed
    #[error("state I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State could not be encoded
    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
