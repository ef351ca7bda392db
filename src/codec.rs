//! Delimiter framing for the switch byte stream.
//!
//! The switch writes records as ASCII text and separates logical chunks with
//! three NUL bytes. [`ChunkCodec`] is a Tokio decoder that splits the stream
//! on that delimiter; [`Chunk`] is the validated text of one segment.
//!
//! # Error Handling
//!
//! Framing failures are described by [`FramingError`]. A stream ending in the
//! middle of a chunk is not an error: the partial bytes are discarded and the
//! stream ends cleanly, matching a switch that hangs up mid-transmission.

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

pub mod error;

pub use error::{FramingError, IncompleteChunk};

/// Byte sequence separating chunks on the wire.
pub const DELIMITER: &[u8] = b"\0\0\0";

/// Text form of [`DELIMITER`], stripped from decoded chunks.
const DELIMITER_STR: &str = "\0\0\0";

/// Minimum accepted chunk length limit in bytes.
///
/// Limits passed to [`ChunkCodec::new`] are raised to at least this value so
/// a single record line always fits.
pub const MIN_CHUNK_LENGTH: usize = 128;

/// Maximum accepted chunk length limit in bytes (16 MiB).
pub const MAX_CHUNK_LENGTH: usize = 16 * 1024 * 1024;

/// Default chunk length limit in bytes (1 MiB).
pub const DEFAULT_CHUNK_LENGTH: usize = 1024 * 1024;

pub(crate) fn clamp_chunk_length(value: usize) -> usize {
    value.clamp(MIN_CHUNK_LENGTH, MAX_CHUNK_LENGTH)
}

/// Decoder splitting a byte stream on [`DELIMITER`].
///
/// Emitted frames never include the delimiter. Empty frames (two delimiters
/// back to back) are emitted as empty [`Bytes`]; [`Chunk::from_frame`]
/// discards them.
///
/// ```
/// use bytes::BytesMut;
/// use cdr_collect::codec::ChunkCodec;
/// use tokio_util::codec::Decoder;
///
/// let mut codec = ChunkCodec::default();
/// let mut buf = BytesMut::from(&b"first\0\0\0sec"[..]);
/// assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some(&b"first"[..]));
/// assert_eq!(codec.decode(&mut buf).unwrap(), None);
/// ```
#[derive(Clone, Debug)]
pub struct ChunkCodec {
    max_chunk_length: usize,
    // Offset from which the next delimiter search resumes.
    next_index: usize,
}

impl ChunkCodec {
    /// Construct a codec accepting chunks of up to `max_chunk_length` bytes.
    #[must_use]
    pub fn new(max_chunk_length: usize) -> Self {
        Self {
            max_chunk_length: clamp_chunk_length(max_chunk_length),
            next_index: 0,
        }
    }

    /// Return the maximum chunk length accepted by this codec.
    #[must_use]
    pub fn max_chunk_length(&self) -> usize { self.max_chunk_length }
}

impl Default for ChunkCodec {
    fn default() -> Self { Self::new(DEFAULT_CHUNK_LENGTH) }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}

impl Decoder for ChunkCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let start = self.next_index.min(src.len());
        if let Some(offset) = find_delimiter(&src[start..]) {
            let end = start + offset;
            self.next_index = 0;
            if end > self.max_chunk_length {
                return Err(oversized(end, self.max_chunk_length));
            }
            let frame = src.split_to(end).freeze();
            src.advance(DELIMITER.len());
            return Ok(Some(frame));
        }

        // A delimiter may straddle the next read; rescan its possible prefix.
        self.next_index = src.len().saturating_sub(DELIMITER.len() - 1);
        if src.len() > self.max_chunk_length + DELIMITER.len() - 1 {
            return Err(oversized(src.len(), self.max_chunk_length));
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            let err = IncompleteChunk {
                bytes_received: src.len(),
            };
            tracing::debug!(error = %err, "discarding unterminated chunk at end of stream");
            src.clear();
            self.next_index = 0;
        }
        Ok(None)
    }
}

fn oversized(size: usize, max: usize) -> io::Error {
    FramingError::OversizedChunk { size, max }.into()
}

/// Text of one delimiter-separated segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk(String);

impl Chunk {
    /// Validate a decoded frame as chunk text.
    ///
    /// Returns `Ok(None)` when nothing remains once residual delimiters are
    /// stripped.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::NonAscii`] if the frame holds a byte outside
    /// the ASCII range.
    pub fn from_frame(frame: &[u8]) -> Result<Option<Self>, FramingError> {
        if let Some(offset) = frame.iter().position(|byte| !byte.is_ascii()) {
            return Err(FramingError::NonAscii { offset });
        }
        let text = String::from_utf8_lossy(frame).replace(DELIMITER_STR, "");
        Ok((!text.is_empty()).then_some(Self(text)))
    }

    /// Borrow the chunk text.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }

    /// Length of the chunk text in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Always `false`: empty segments never become chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str { &self.0 }
}
