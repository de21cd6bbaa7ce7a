// error.rs — Error types for the policy subsystem.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading policies or building request contexts.
///
/// Parsing itself never fails: malformed blocks are skipped. Evaluation
/// never fails either. These variants only cover I/O and URL handling.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A request URL could not be parsed into a context.
    #[error("invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
