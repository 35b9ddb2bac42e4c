//! HTTP Range request parsing module
//!
//! Range header parsing for resumable downloads. Only the first sub-range of
//! a `bytes=` header is honored; multipart byte-ranges are not produced.

/// Inclusive byte window into a file, `start <= end < size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Window covering a whole file, `None` for an empty file
    pub const fn full(size: u64) -> Option<Self> {
        if size == 0 {
            None
        } else {
            Some(Self {
                start: 0,
                end: size - 1,
            })
        }
    }

    /// Number of bytes in the window
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A window always holds at least one byte
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Range header parse result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Well-formed range, clamped to the file (206)
    Valid(ByteRange),
    /// Start at or beyond the end of the file
    NotSatisfiable,
    /// No Range header or malformed (ignore, return full content)
    None,
}

/// Parse HTTP Range header against a file of `file_size` bytes
///
/// Supported form is `bytes=START-END` where either bound may be empty:
/// - empty `START` reads as 0
/// - empty `END` reads as the last byte of the file
///
/// Only the first comma-separated sub-range is considered. An `END` past the
/// file is clamped; an `END` before `START` is treated as malformed.
///
/// # Examples
/// ```
/// use filestream::http::range::{parse_range_header, ByteRange, RangeParseResult};
///
/// let result = parse_range_header(Some("bytes=100-199"), 1000);
/// assert_eq!(result, RangeParseResult::Valid(ByteRange { start: 100, end: 199 }));
///
/// let result = parse_range_header(None, 1000);
/// assert_eq!(result, RangeParseResult::None);
/// ```
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };

    let Some((unit, spec)) = header.split_once('=') else {
        return RangeParseResult::None;
    };
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return RangeParseResult::None; // Not bytes unit, ignore
    }

    // Multi-range requests: honor the first sub-range only
    let first = spec.split(',').next().unwrap_or_default();

    let Some((start_str, end_str)) = first.split_once('-') else {
        return RangeParseResult::None;
    };

    let start = match parse_bound(start_str) {
        Bound::Empty => 0,
        Bound::Value(v) => v,
        Bound::Invalid => return RangeParseResult::None,
    };

    let end = match parse_bound(end_str) {
        Bound::Empty => None,
        Bound::Value(v) => Some(v),
        Bound::Invalid => return RangeParseResult::None,
    };

    if end.is_some_and(|e| e < start) {
        return RangeParseResult::None;
    }

    // Start beyond file size is not satisfiable
    if start >= file_size {
        return RangeParseResult::NotSatisfiable;
    }

    let last = file_size - 1;
    let end = end.map_or(last, |e| e.min(last));

    RangeParseResult::Valid(ByteRange { start, end })
}

enum Bound {
    Empty,
    Value(u64),
    Invalid,
}

/// Digits only; signs and overflow are rejected
fn parse_bound(raw: &str) -> Bound {
    let raw = raw.trim();
    if raw.is_empty() {
        return Bound::Empty;
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Bound::Invalid;
    }
    raw.parse::<u64>().map_or(Bound::Invalid, Bound::Value)
}
