//! Errors raised while exporting decoded records.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{record::RecordError, sender::SendError};

/// A single record could not be exported.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing a storage artifact failed.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A candidate line could not be decoded.
    #[error("malformed record: {0}")]
    Record(#[from] RecordError),

    /// The billing sender failed.
    #[error(transparent)]
    Send(#[from] SendError),
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// Returns the error category as a string for logging and metrics.
    ///
    /// One of `"io"`, `"record"`, `"spawn"` or `"command"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Record(_) => "record",
            Self::Send(SendError::Spawn { .. }) => "spawn",
            Self::Send(SendError::Command(_)) => "command",
        }
    }
}

/// Result type for export operations.
pub type Result<T, E = ExportError> = std::result::Result<T, E>;
