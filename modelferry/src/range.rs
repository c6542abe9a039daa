//! HTTP byte-range headers.
//!
//! Pure functions for building `Range` request headers and parsing
//! `Content-Range` response headers (RFC 9110 §14).
//!
//! | Function                          | Output              |
//! |-----------------------------------|---------------------|
//! | `build_range_header(1024)`        | `bytes=1024-`       |
//! | `build_range_header_with_end(0, 999)` | `bytes=0-999`   |
//! | `build_range_header_suffix(500)`  | `bytes=-500`        |

use thiserror::Error;

/// Unit token used in range headers.
const BYTES_UNIT: &str = "bytes";

/// Errors from parsing range headers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The header was empty.
    #[error("empty Content-Range header")]
    Empty,

    /// The header did not match `bytes <start>-<end>/<total|*>`.
    #[error("invalid Content-Range format: {0:?}")]
    InvalidFormat(String),

    /// The header parsed but describes an impossible range.
    #[error("invalid Content-Range bounds: {0:?}")]
    InvalidBounds(String),
}

/// A parsed `Content-Range` header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte position (inclusive).
    pub start: u64,
    /// Last byte position (inclusive).
    pub end: u64,
    /// Complete resource length; `None` when the server sent `*`.
    pub total: Option<u64>,
}

impl ContentRange {
    /// Number of bytes in the returned range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false: a satisfiable range holds at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Build an open-ended `Range` value for resuming at `offset`.
///
/// Negative offsets are treated as 0.
pub fn build_range_header(offset: i64) -> String {
    format!("{}={}-", BYTES_UNIT, offset.max(0))
}

/// Build a closed `Range` value `bytes=<start>-<end>`.
///
/// Negative values are treated as 0 and inverted bounds are swapped.
pub fn build_range_header_with_end(start: i64, end: i64) -> String {
    let (mut start, mut end) = (start.max(0), end.max(0));
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    format!("{}={}-{}", BYTES_UNIT, start, end)
}

/// Build a suffix `Range` value requesting the last `length` bytes.
///
/// Values below 1 are treated as 1.
pub fn build_range_header_suffix(length: i64) -> String {
    format!("{}=-{}", BYTES_UNIT, length.max(1))
}

/// Parse a `Content-Range` response header.
///
/// The grammar is strict: `bytes <start>-<end>/<total>` or
/// `bytes <start>-<end>/*`. Anything else, including trailing garbage, signs
/// or whitespace inside the numbers, is rejected.
pub fn parse_content_range(header: &str) -> Result<ContentRange, RangeError> {
    if header.is_empty() {
        return Err(RangeError::Empty);
    }
    let invalid = || RangeError::InvalidFormat(header.to_string());

    let spec = header
        .strip_prefix(BYTES_UNIT)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(invalid)?;
    let (range, total) = spec.split_once('/').ok_or_else(invalid)?;
    let (start, end) = range.split_once('-').ok_or_else(invalid)?;

    let start = parse_position(start).ok_or_else(invalid)?;
    let end = parse_position(end).ok_or_else(invalid)?;
    let total = match total {
        "*" => None,
        other => Some(parse_position(other).ok_or_else(invalid)?),
    };

    if end < start || total.is_some_and(|t| end >= t) {
        return Err(RangeError::InvalidBounds(header.to_string()));
    }

    Ok(ContentRange { start, end, total })
}

/// Whether an `Accept-Ranges` value advertises byte-range support.
///
/// Exact, case-sensitive match on `bytes`.
pub fn is_partial_content_supported(accept_ranges: &str) -> bool {
    accept_ranges == BYTES_UNIT
}

fn parse_position(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
