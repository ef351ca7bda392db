//! Downstream renderings of a [`CallRecord`].
//!
//! Two line formats are produced: the semicolon-separated audit line
//! appended to `cdr.csv`, and the input line consumed by the UTM5 sender.
//! Both are pure functions of the record.

use std::fmt;

use crate::record::CallRecord;

/// Date components as `(day, month, year)`.
///
/// Splitting is positional and lenient: short or empty input yields short or
/// empty components.
#[must_use]
pub fn split_date(date: &str) -> (&str, &str, &str) {
    let (day, rest) = split_prefix(date, 2);
    let (month, rest) = split_prefix(rest, 2);
    let (year, _) = split_prefix(rest, 2);
    (day, month, year)
}

/// Time components as `(hours, minutes)`; minutes is everything after the
/// first two characters.
#[must_use]
pub fn split_time(time: &str) -> (&str, &str) { split_prefix(time, 2) }

/// Duration with trailing `'0'` characters removed.
///
/// This is a character strip carried over from the legacy export format,
/// not numeric rounding: `"00120"` becomes `"0012"`.
#[must_use]
pub fn trimmed_duration(sec_dur: &str) -> &str { sec_dur.trim_end_matches('0') }

fn split_prefix(value: &str, chars: usize) -> (&str, &str) {
    let at = value
        .char_indices()
        .nth(chars)
        .map_or(value.len(), |(idx, _)| idx);
    value.split_at(at)
}

/// Audit rendering appended to `cdr.csv`.
///
/// ```
/// use cdr_collect::{format::CsvLine, record::CallRecord};
///
/// let record = CallRecord {
///     date: "150324".into(),
///     time: "0930".into(),
///     sec_dur: "00120".into(),
///     ..CallRecord::default()
/// };
/// assert!(CsvLine(&record).to_string().starts_with("15;03;24;09;30;0012;"));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CsvLine<'a>(pub &'a CallRecord);

impl fmt::Display for CsvLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        let (day, month, year) = split_date(&record.date);
        let (hours, minutes) = split_time(&record.time);
        write!(
            f,
            "{day};{month};{year};{hours};{minutes};{};{};{};{};{};{};{};{}",
            trimmed_duration(&record.sec_dur),
            record.dialed_num,
            record.calling_num,
            record.code_used,
            record.code_dial,
            record.in_trk_code,
            record.frl,
            record.out_crt_id,
        )
    }
}

/// Rendering written to the per-record sender file.
#[derive(Clone, Copy, Debug)]
pub struct SenderLine<'a>(pub &'a CallRecord);

impl fmt::Display for SenderLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        let (day, month, year) = split_date(&record.date);
        let (hours, minutes) = split_time(&record.time);
        write!(
            f,
            "{};{};{};{day}-{month}-{year} {hours}:{minutes}:00",
            record.calling_num,
            record.dialed_num,
            trimmed_duration(&record.sec_dur),
        )
    }
}

impl CallRecord {
    /// Render the audit CSV line, without a trailing newline.
    #[must_use]
    pub fn to_csv(&self) -> String { CsvLine(self).to_string() }

    /// Render the sender input line, without a trailing newline.
    #[must_use]
    pub fn to_sender_input(&self) -> String { SenderLine(self).to_string() }
}
