//! Error types for streamwarden-engine — Railway Programming
//!
//! All fallible operations return `Result<T, EngineError>`.
//! Auth outcomes (wrong password, blocked user, ...) are *not* errors: they are
//! ordinary [`AuthOutcome`](crate::registry::AuthOutcome) values folded into the
//! audit trail.

use thiserror::Error;

/// Unified error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    // ─── Admission Errors ───

    #[error("Maximum streams limit reached ({max})")]
    CapacityExceeded { max: usize },

    #[error("Shutting down, no new streams are admitted")]
    ShuttingDown,

    // ─── Input Errors ───

    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    // ─── Infrastructure Errors ───

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Actor unavailable: {0}")]
    ActorUnavailable(String),
}

impl EngineError {
    /// Whether the error is a capacity rejection (distinct indicator for callers)
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InvalidSubmission(err.to_string())
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
