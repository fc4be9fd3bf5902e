//! Error types for agent-runtime

use thiserror::Error;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while starting or advancing a run
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Store operation failed
    #[error(transparent)]
    Store(#[from] relay_core::Error),

    /// Completion provider call failed
    #[error("Completion provider error: {message}")]
    Provider { message: String },

    /// Run requested by id has no record
    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    /// Store accepted a write but the run could not be read back
    #[error("Run missing after step: {run_id}")]
    RunMissingAfterStep { run_id: String },
}

impl RuntimeError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Whether this error means the run does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RunNotFound { .. } => true,
            Self::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}
