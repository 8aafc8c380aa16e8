// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! `AT+HTTPREAD` reply parsing.
//!
//! The modem frames each chunk as
//!
//! ```text
//! \r\nOK\r\n\r\n+HTTPREAD: DATA,<n>\r\n<payload>\r\n+HTTPREAD: 0\r\n
//! ```
//!
//! where `<payload>` is raw binary that may itself contain CR-LF pairs or
//! marker-like text. Completion is decided by the end sentinel, extraction
//! by the declared length; neither is a string operation.

use crate::scan;

pub const DATA_MARKER: &[u8] = b"+HTTPREAD: DATA,";
pub const READ_MARKER: &[u8] = b"+HTTPREAD: ";
pub const END_SENTINEL: &[u8] = b"+HTTPREAD: 0";
const BOUNDED_SENTINEL: &[u8] = b"\r\n+HTTPREAD: 0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkError {
    /// No data-length marker anywhere in the reply.
    NoDataMarker,
    /// Declared length is zero or exceeds the requested read size.
    BadLength { declared: usize, requested: usize },
    /// The marker line never terminated.
    MissingHeaderEnd,
    /// Fewer payload bytes before the end sentinel than declared.
    Underrun { have: usize, need: usize },
}

/// True once the end-of-chunk sentinel has arrived. This, not a byte count,
/// ends accumulation: the payload length varies and the trailing sentinel
/// is the only reliable terminator.
pub fn is_complete(raw: &[u8]) -> bool {
    scan::contains(raw, END_SENTINEL)
}

/// Locate the data-length marker and the offset of its digits.
///
/// The normal form is `+HTTPREAD: DATA,<n>`. Some firmware revisions reply
/// with the degenerate `+HTTPREAD: <n>`, which collides with the end
/// sentinel (`+HTTPREAD: 0`) and the buffer-length reply
/// (`+HTTPREAD: LEN,...`); those are skipped by checking the byte after
/// the colon-space.
fn locate_marker(raw: &[u8]) -> Option<(usize, usize)> {
    if let Some(at) = scan::find(raw, DATA_MARKER) {
        return Some((at, at + DATA_MARKER.len()));
    }

    let mut from = 0;
    while let Some(rel) = scan::find(&raw[from..], READ_MARKER) {
        let at = from + rel;
        let digits = at + READ_MARKER.len();
        match raw.get(digits) {
            Some(b'0') | Some(b'L') | None => from = at + 1,
            Some(_) => return Some((at, digits)),
        }
    }
    None
}

/// Extract the payload of one chunk reply.
///
/// `requested` is the size passed to `AT+HTTPREAD`; the declared length may
/// be smaller (last chunk) but never larger.
pub fn parse(raw: &[u8], requested: usize) -> Result<&[u8], ChunkError> {
    let (marker, digits) = locate_marker(raw).ok_or(ChunkError::NoDataMarker)?;

    let (declared, _) = scan::parse_decimal(&raw[digits..]).ok_or(ChunkError::NoDataMarker)?;
    let declared = declared as usize;
    if declared == 0 || declared > requested {
        return Err(ChunkError::BadLength {
            declared,
            requested,
        });
    }

    // Binary payload begins right after the marker line's CR-LF.
    let line_end = scan::find(&raw[marker..], b"\r\n").ok_or(ChunkError::MissingHeaderEnd)?;
    let payload = &raw[marker + line_end + 2..];

    // The end sentinel bounds the payload; if it cannot be found (it may be
    // split across reads), fall back to the declared length.
    let available = match scan::find(payload, BOUNDED_SENTINEL) {
        Some(end) => end,
        None => payload.len(),
    };
    if available < declared {
        return Err(ChunkError::Underrun {
            have: available,
            need: declared,
        });
    }

    Ok(&payload[..declared])
}
