// error.rs — Error types for the event log.
//
// Each variant maps to a specific failure mode in the logging pipeline.
// Callers on the request path never see these: the interceptor records
// through `EventLog::record`, which reports the first failure and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during event log operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to create the directories leading to the log file.
    #[error("failed to create log directory {path}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open or create the log file.
    #[error("failed to open event log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an event to the log.
    #[error("failed to append event: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Failed to serialize or deserialize an event (malformed JSON).
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
