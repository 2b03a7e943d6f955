//! Errors surfaced by a scan
//!
//! Malformed log lines never show up here: they are reported to the
//! parser's diagnostic sink and skipped.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::ValidationError;

/// Fatal conditions, each a distinct kind so callers can render a specific message
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {}: {reason}", path.display())]
    Configuration { path: PathBuf, reason: String },

    #[error("Invalid value: {0}")]
    Validation(#[from] ValidationError),
}

impl ScanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }
}
