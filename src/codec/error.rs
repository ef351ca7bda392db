//! Error types for the chunk framing layer.
//!
//! - [`FramingError`]: problems with a segment itself (too long, not ASCII).
//! - [`IncompleteChunk`]: bytes left without a closing delimiter when the
//!   stream ended. Recovered by discarding them, never surfaced as an error.

use std::io;

use thiserror::Error;

/// Segment-level framing errors.
///
/// ```
/// use cdr_collect::codec::FramingError;
///
/// let err = FramingError::NonAscii { offset: 3 };
/// assert_eq!(err.error_type(), "non_ascii");
/// assert!(!err.should_disconnect());
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// No delimiter arrived within the configured chunk length limit.
    #[error("chunk exceeds max length: {size} > {max}")]
    OversizedChunk {
        /// Bytes buffered without a delimiter.
        size: usize,
        /// Maximum allowed chunk size.
        max: usize,
    },

    /// The segment contains a byte outside the ASCII range.
    #[error("non-ASCII byte at offset {offset}")]
    NonAscii {
        /// Offset of the first offending byte within the segment.
        offset: usize,
    },
}

impl FramingError {
    /// Returns true if reading from the connection must stop.
    ///
    /// A non-ASCII segment is local to one chunk. An oversized one leaves the
    /// stream position unknown.
    #[must_use]
    pub fn should_disconnect(&self) -> bool { matches!(self, Self::OversizedChunk { .. }) }

    /// Returns the error category as a string for logging and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::OversizedChunk { .. } => "oversized",
            Self::NonAscii { .. } => "non_ascii",
        }
    }
}

impl From<FramingError> for io::Error {
    fn from(err: FramingError) -> Self { io::Error::new(io::ErrorKind::InvalidData, err) }
}

/// The stream ended before the last chunk was terminated.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("premature EOF: {bytes_received} bytes without a closing delimiter")]
pub struct IncompleteChunk {
    /// Bytes buffered when the stream ended.
    pub bytes_received: usize,
}
