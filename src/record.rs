//! Fixed-width call detail record decoding.
//!
//! The switch emits one record per 77-column line. Columns are separated by
//! runs of padding spaces, so a line is decoded by splitting on whitespace
//! and assigning the tokens positionally. An empty `code_dial` column
//! collapses during the split and is restored before the record is built.

use thiserror::Error;

/// Exact length in characters of a line carrying a call record.
pub const RECORD_LENGTH: usize = 77;

/// Number of whitespace-separated tokens in a complete record.
pub const FIELD_COUNT: usize = 10;

/// Token index of the optional `code_dial` column.
pub const CODE_DIAL_INDEX: usize = 6;

/// Errors raised while decoding a candidate record line.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Whitespace splitting produced a token count that cannot be mapped to
    /// record fields.
    #[error("expected {expected} fields (or {missing} without code_dial), found {found}: {line:?}")]
    TokenCount {
        /// Number of tokens produced by the split.
        found: usize,
        /// Complete field count.
        expected: usize,
        /// Field count accepted when `code_dial` is absent.
        missing: usize,
        /// The offending line.
        line: String,
    },
}

/// One decoded call detail record.
///
/// Every field is kept as the raw text found on the wire; no numeric or
/// telephony validation is applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallRecord {
    /// Call date as `DDMMYY`.
    pub date: String,
    /// Call start time as `HHMM`.
    pub time: String,
    /// Call duration in seconds.
    pub sec_dur: String,
    /// Number dialled by the caller.
    pub dialed_num: String,
    /// Number of the calling party.
    pub calling_num: String,
    /// Account code used.
    pub code_used: String,
    /// Account code dialled, empty when absent on the wire.
    pub code_dial: String,
    /// Incoming trunk code.
    pub in_trk_code: String,
    /// Facility restriction level.
    pub frl: String,
    /// Outgoing circuit identifier.
    pub out_crt_id: String,
}

impl CallRecord {
    /// Build a record from exactly [`FIELD_COUNT`] positional tokens.
    ///
    /// Returns `None` when the slice has any other length.
    #[must_use]
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        let [
            date,
            time,
            sec_dur,
            dialed_num,
            calling_num,
            code_used,
            code_dial,
            in_trk_code,
            frl,
            out_crt_id,
        ] = fields
        else {
            return None;
        };
        Some(Self {
            date: (*date).to_owned(),
            time: (*time).to_owned(),
            sec_dur: (*sec_dur).to_owned(),
            dialed_num: (*dialed_num).to_owned(),
            calling_num: (*calling_num).to_owned(),
            code_used: (*code_used).to_owned(),
            code_dial: (*code_dial).to_owned(),
            in_trk_code: (*in_trk_code).to_owned(),
            frl: (*frl).to_owned(),
            out_crt_id: (*out_crt_id).to_owned(),
        })
    }
}

/// Return `true` if `line` has the exact shape of a record line.
///
/// Anything else is switch noise (banners, page headers, blank lines) and is
/// skipped without being reported.
#[must_use]
pub fn is_candidate(line: &str) -> bool { line.chars().count() == RECORD_LENGTH }

/// Decode a single candidate line.
///
/// # Errors
///
/// Returns [`RecordError::TokenCount`] when the line splits into anything
/// other than [`FIELD_COUNT`] or `FIELD_COUNT - 1` tokens.
pub fn parse_line(line: &str) -> Result<CallRecord, RecordError> {
    let mut fields: Vec<&str> = tokens(line).collect();
    let found = fields.len();
    if fields.len() == FIELD_COUNT - 1 {
        fields.insert(CODE_DIAL_INDEX, "");
    }
    CallRecord::from_fields(&fields).ok_or_else(|| RecordError::TokenCount {
        found,
        expected: FIELD_COUNT,
        missing: FIELD_COUNT - 1,
        line: line.to_owned(),
    })
}

/// Split a line on runs of whitespace, counting the ASCII unit separator as
/// whitespace too.
fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == '\x1f')
        .filter(|token| !token.is_empty())
}

/// Split chunk text into physical lines.
///
/// Carriage returns, line feeds and the remaining ASCII line boundaries are
/// all treated as separators. Empty pieces are harmless: they never pass
/// [`is_candidate`].
pub fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e'])
}

/// Decode every candidate line in a chunk, in order.
///
/// Lines failing [`is_candidate`] are filtered out; the remaining lines
/// yield either a record or the reason they could not be decoded.
pub fn decode_chunk(text: &str) -> impl Iterator<Item = Result<CallRecord, RecordError>> + '_ {
    lines(text).filter(|line| is_candidate(line)).map(parse_line)
}
