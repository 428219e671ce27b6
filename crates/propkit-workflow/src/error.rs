//! Error types for the characterization workflow

use std::path::PathBuf;

use propkit_core::PropertyError;
use propkit_service::DataServiceError;

/// Errors while running the characterization workflow
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Reading, declaring or assigning a property failed
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// The shared reduction manager could not be obtained
    #[error(transparent)]
    DataService(#[from] DataServiceError),

    /// An input failed its validator
    #[error("invalid input '{name}': {message}")]
    InvalidInput { name: String, message: String },

    /// A non-empty table was supplied without run logs to match against
    #[error("a characterization table needs run logs to select a row")]
    MissingRunLogs,

    /// IO error reading an input file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed table or log JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for workflow operations
pub type Result<T, E = WorkflowError> = std::result::Result<T, E>;
