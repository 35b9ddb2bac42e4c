//! Response header building module
//!
//! Produces the ordered header list for a file response. The order is
//! relied upon by older download clients and must stay:
//!
//! 1. `Content-Type`
//! 2. disposition and caching headers
//! 3. `Accept-Ranges`
//! 4. `Content-Length` (and `Content-Range` for partial responses)

use chrono::{DateTime, Duration, Utc};
use hyper::header::{self, HeaderName, HeaderValue, InvalidHeaderValue};

use crate::file::FileDescriptor;
use crate::http::cache;
use crate::http::mime;
use crate::http::range::ByteRange;

/// Ordered response headers
pub type HeaderList = Vec<(HeaderName, HeaderValue)>;

/// Default read size per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default client cache lifetime (30 days)
pub const DEFAULT_CACHE_SECONDS: u64 = 2_592_000;

/// Whether content is shown by the client or saved as a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    #[default]
    Inline,
    Attachment,
}

/// Per-request caching and disposition settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingDirectives {
    /// Explicit Content-Type, overrides extension lookup
    pub mime_type: Option<String>,
    pub disposition: Disposition,
    pub chunk_size: usize,
    pub cache_seconds: u64,
    /// Emit `Last-Modified`/`ETag` and answer conditional requests
    pub validators: bool,
}

impl Default for StreamingDirectives {
    fn default() -> Self {
        Self {
            mime_type: None,
            disposition: Disposition::Inline,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache_seconds: DEFAULT_CACHE_SECONDS,
            validators: false,
        }
    }
}

/// Everything the header list is derived from
#[derive(Debug, Clone, Copy)]
pub struct HeaderParams<'a> {
    pub content_type: &'a str,
    pub file_name: &'a str,
    pub file: &'a FileDescriptor,
    /// `Some` only for partial (206) responses
    pub range: Option<ByteRange>,
    pub directives: &'a StreamingDirectives,
    /// `Some` when validators are enabled and caching is allowed
    pub etag: Option<&'a str>,
    pub now: DateTime<Utc>,
}

/// Whether the response is delivered as a download
///
/// Unknown types always download, whatever was requested.
pub fn is_attachment(content_type: &str, disposition: Disposition) -> bool {
    disposition == Disposition::Attachment || mime::is_force_download(content_type)
}

/// Build the ordered response header list
pub fn build_headers(params: &HeaderParams<'_>) -> Result<HeaderList, InvalidHeaderValue> {
    let mut headers = HeaderList::with_capacity(10);

    headers.push((
        header::CONTENT_TYPE,
        HeaderValue::from_str(params.content_type)?,
    ));

    if is_attachment(params.content_type, params.directives.disposition) {
        let name = sanitize_filename(params.file_name);
        headers.push((
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))?,
        ));
        headers.push((
            HeaderName::from_static("content-transfer-encoding"),
            HeaderValue::from_static("binary"),
        ));

        // Disable caching
        headers.push((header::CACHE_CONTROL, HeaderValue::from_static("private")));
        headers.push((header::PRAGMA, HeaderValue::from_static("private")));
        headers.push((header::EXPIRES, HeaderValue::from_static(cache::EXPIRED_DATE)));
    } else {
        let seconds = params.directives.cache_seconds;
        let expires = i64::try_from(seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| params.now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        headers.push((header::EXPIRES, HeaderValue::from_str(&cache::http_date(expires))?));
        headers.push((header::PRAGMA, HeaderValue::from_static("cache")));
        headers.push((
            header::CACHE_CONTROL,
            HeaderValue::from_str(&format!("max-age={seconds}"))?,
        ));

        if let Some(etag) = params.etag {
            headers.push((
                header::LAST_MODIFIED,
                HeaderValue::from_str(&cache::http_date(params.file.modified))?,
            ));
            headers.push((header::ETAG, HeaderValue::from_str(etag)?));
        }
    }

    headers.push((header::ACCEPT_RANGES, HeaderValue::from_static("bytes")));

    match params.range {
        Some(range) => {
            headers.push((header::CONTENT_LENGTH, HeaderValue::from(range.len())));
            headers.push((
                header::CONTENT_RANGE,
                HeaderValue::from_str(&format!(
                    "bytes {}-{}/{}",
                    range.start, range.end, params.file.size
                ))?,
            ));
        }
        None => {
            headers.push((header::CONTENT_LENGTH, HeaderValue::from(params.file.size)));
        }
    }

    Ok(headers)
}

/// Strip a filename down to characters safe on Windows and Linux
///
/// Keeps ASCII letters, digits and `. _ - space + ( ) [ ]`. Quotes and line
/// breaks can therefore never escape the `filename="..."` parameter.
pub fn sanitize_filename(file_name: &str) -> String {
    let clean: String = file_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "._- +()[]".contains(*c))
        .collect();

    if clean.trim().is_empty() {
        "download".to_string()
    } else {
        clean
    }
}
