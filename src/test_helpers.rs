#![cfg(any(test, feature = "test-helpers"))]
//! Test-only helpers for building switch output.

use crate::codec::DELIMITER;

/// Column values of one wire line, before padding.
#[derive(Clone, Debug)]
pub struct WireFields<'a> {
    pub date: &'a str,
    pub time: &'a str,
    pub sec_dur: &'a str,
    pub dialed_num: &'a str,
    pub calling_num: &'a str,
    pub code_used: &'a str,
    pub code_dial: &'a str,
    pub in_trk_code: &'a str,
    pub frl: &'a str,
    pub out_crt_id: &'a str,
}

impl Default for WireFields<'_> {
    fn default() -> Self {
        Self {
            date: "150324",
            time: "0930",
            sec_dur: "00120",
            dialed_num: "5556789",
            calling_num: "5551234",
            code_used: "12",
            code_dial: "77",
            in_trk_code: "T001",
            frl: "3",
            out_crt_id: "R042",
        }
    }
}

impl WireFields<'_> {
    /// Lay the fields out in their fixed columns, producing a 77-character
    /// line when every value fits its column.
    #[must_use]
    pub fn line(&self) -> String {
        format!(
            "{:<6} {:<4} {:<5} {:<21} {:<15} {:<4} {:<4} {:<4} {:<1} {:<4}",
            self.date,
            self.time,
            self.sec_dur,
            self.dialed_num,
            self.calling_num,
            self.code_used,
            self.code_dial,
            self.in_trk_code,
            self.frl,
            self.out_crt_id,
        )
    }
}

/// Default record line with the given `code_dial` column.
#[must_use]
pub fn wire_line(code_dial: &str) -> String {
    WireFields {
        code_dial,
        ..WireFields::default()
    }
    .line()
}

/// Join `chunks` into a byte stream, terminating each with the delimiter.
#[must_use]
pub fn framed(chunks: &[&str]) -> Vec<u8> {
    let mut stream = Vec::new();
    for chunk in chunks {
        stream.extend_from_slice(chunk.as_bytes());
        stream.extend_from_slice(DELIMITER);
    }
    stream
}
