//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No state store configured: provide SUPABASE_* or UPSTASH_* credentials")]
    NoStoreConfigured,

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run already exists: {0}")]
    RunExists(String),

    #[error("Version conflict on run {run_id}: expected {expected}, found {actual:?}")]
    VersionConflict {
        run_id: String,
        expected: u64,
        actual: Option<u64>,
    },

    #[error("{backend} error (status {status:?}): {message}")]
    Backend {
        backend: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn backend(backend: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            status,
            message: message.into(),
        }
    }

    /// Whether this error means the requested run has no record
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RunNotFound(_))
    }
}
