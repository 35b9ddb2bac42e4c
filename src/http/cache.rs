//! HTTP cache control module
//!
//! Provides HTTP-date formatting, `ETag` generation and conditional request
//! handling.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Fixed past date sent with downloads so that nothing caches them
pub const EXPIRED_DATE: &str = "Mon, 23 Jul 1997 05:00:00 GMT";

/// Format an instant as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP-date as sent in `If-Modified-Since`
///
/// The weekday prefix is skipped, not checked: [`EXPIRED_DATE`] itself names
/// the wrong day (23 Jul 1997 was a Wednesday).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let date = value.split_once(", ").map_or(value, |(_, rest)| rest);
    NaiveDateTime::parse_from_str(date, "%d %b %Y %H:%M:%S GMT")
        .ok()
        .map(|t| t.and_utc())
}

/// Generate `ETag` from file identity (name, size, modification time)
///
/// # Returns
/// Quoted `ETag` string, e.g., `"abc123def"`
pub fn generate_etag(file_name: &str, size: u64, modified: DateTime<Utc>) -> String {
    let mut hasher = DefaultHasher::new();
    file_name.hash(&mut hasher);
    size.hash(&mut hasher);
    modified.timestamp().hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Weak comparison: `W/"abc123"`
/// - Wildcard: `*`
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').any(|e| {
            let e = e.trim();
            e == "*" || e.strip_prefix("W/").unwrap_or(e) == etag
        })
    })
}

/// Decide whether a conditional GET can be answered with 304
///
/// `If-None-Match` takes precedence; `If-Modified-Since` is only consulted
/// when no entity tags were sent. Comparison is at whole-second precision.
pub fn is_not_modified(
    if_none_match: Option<&str>,
    if_modified_since: Option<&str>,
    etag: &str,
    last_modified: DateTime<Utc>,
) -> bool {
    if if_none_match.is_some() {
        return check_etag_match(if_none_match, etag);
    }

    if_modified_since
        .and_then(parse_http_date)
        .is_some_and(|since| last_modified.timestamp() <= since.timestamp())
}
