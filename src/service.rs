//! File streaming service
//!
//! Orchestrates one file response:
//!
//! ```text
//! Validating -> HeadersBuilt -> Streaming -> Completed | Aborted | FatalIoError
//! ```
//!
//! [`prepare`] covers the pre-commit phases; any error it returns leaves the
//! connection untouched so the caller can still send an error status.
//! [`PreparedStream::stream`] is post-commit: it consumes the prepared
//! response, so headers are fixed before the first body byte, and it never
//! returns an error, only logs it.

use chrono::{DateTime, Utc};
use hyper::header::{self, HeaderMap};
use std::fmt;
use std::path::Path;

use crate::error::ServeError;
use crate::file::FileDescriptor;
use crate::http::cache;
use crate::http::headers::{self, HeaderList, HeaderParams, StreamingDirectives};
use crate::http::mime;
use crate::http::range::{self, ByteRange, RangeParseResult};
use crate::logger;
use crate::stream::{self, BodySink, StreamOutcome};

/// Inputs for one file response
#[derive(Debug, Clone, Copy)]
pub struct StreamRequest<'a> {
    /// File on disk
    pub path: &'a Path,
    /// Name presented to the client, may be percent-encoded
    pub file_name: &'a str,
    pub directives: &'a StreamingDirectives,
    /// Incoming request headers (`Range`, conditional headers)
    pub headers: &'a HeaderMap,
}

/// Status, ordered headers and body size of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: HeaderList,
    /// Body bytes still to be written
    pub remaining: u64,
}

/// Lifecycle of a single file response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServePhase {
    Validating,
    HeadersBuilt,
    Streaming,
    Completed,
    Aborted,
    FatalIoError,
}

impl ServePhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::HeadersBuilt => "headers-built",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::FatalIoError => "failed",
        }
    }
}

impl fmt::Display for ServePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a committed response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    Completed { bytes_sent: u64 },
    Aborted { bytes_sent: u64 },
    /// Reading the file failed; the response is truncated
    Failed,
}

impl ServeOutcome {
    pub const fn phase(&self) -> ServePhase {
        match self {
            Self::Completed { .. } => ServePhase::Completed,
            Self::Aborted { .. } => ServePhase::Aborted,
            Self::Failed => ServePhase::FatalIoError,
        }
    }

    pub const fn bytes_sent(&self) -> u64 {
        match self {
            Self::Completed { bytes_sent } | Self::Aborted { bytes_sent } => *bytes_sent,
            Self::Failed => 0,
        }
    }
}

impl From<StreamOutcome> for ServeOutcome {
    fn from(outcome: StreamOutcome) -> Self {
        match outcome {
            StreamOutcome::Completed { bytes_sent } => Self::Completed { bytes_sent },
            StreamOutcome::Aborted { bytes_sent } => Self::Aborted { bytes_sent },
        }
    }
}

/// A response whose headers are built but whose body has not been sent
#[derive(Debug)]
pub struct PreparedStream {
    file: FileDescriptor,
    window: Option<ByteRange>,
    chunk_size: usize,
    envelope: ResponseEnvelope,
}

impl PreparedStream {
    pub const fn envelope(&self) -> &ResponseEnvelope {
        &self.envelope
    }

    pub const fn file(&self) -> &FileDescriptor {
        &self.file
    }

    /// Stream the body into `sink`
    ///
    /// Fatal read errors are logged and reported as [`ServeOutcome::Failed`].
    pub async fn stream<S: BodySink>(self, sink: &mut S) -> ServeOutcome {
        let path = self.file.path.display().to_string();
        if self.envelope.remaining == 0 {
            logger::log_debug(&format!("[{}] {path}: no body", ServePhase::Completed));
            return ServeOutcome::Completed { bytes_sent: 0 };
        }

        logger::log_debug(&format!(
            "[{}] {path}: {} bytes in chunks of {}",
            ServePhase::Streaming,
            self.envelope.remaining,
            self.chunk_size
        ));

        match stream::stream_file(&self.file.path, self.window, self.chunk_size, sink).await {
            Ok(outcome @ StreamOutcome::Completed { bytes_sent }) => {
                logger::log_debug(&format!(
                    "[{}] {path}: {bytes_sent} bytes",
                    ServePhase::Completed
                ));
                outcome.into()
            }
            Ok(outcome @ StreamOutcome::Aborted { bytes_sent }) => {
                logger::log_info(&format!(
                    "Client disconnected from {path} after {bytes_sent} of {} bytes",
                    self.envelope.remaining
                ));
                outcome.into()
            }
            Err(e) => {
                logger::log_error(&format!(
                    "[{}] Streaming {path} failed, response truncated: {e}",
                    ServePhase::FatalIoError
                ));
                ServeOutcome::Failed
            }
        }
    }
}

/// Validate the request and build the response envelope
pub async fn prepare(request: &StreamRequest<'_>) -> Result<PreparedStream, ServeError> {
    prepare_at(request, Utc::now()).await
}

/// [`prepare`] with an explicit clock, used for `Expires`
pub async fn prepare_at(
    request: &StreamRequest<'_>,
    now: DateTime<Utc>,
) -> Result<PreparedStream, ServeError> {
    let directives = request.directives;
    logger::log_debug(&format!(
        "[{}] {}",
        ServePhase::Validating,
        request.path.display()
    ));

    if request.path.as_os_str().is_empty() {
        return Err(ServeError::Validation("file path is empty".to_string()));
    }
    if request.file_name.trim().is_empty() {
        return Err(ServeError::Validation("file name is empty".to_string()));
    }
    if directives.chunk_size == 0 {
        return Err(ServeError::Validation("chunk size must be positive".to_string()));
    }

    let file = FileDescriptor::probe(request.path)
        .await
        .map_err(|source| ServeError::NotReadable {
            path: request.path.to_path_buf(),
            source,
        })?;

    let file_name = decode_file_name(request.file_name);
    let content_type = mime::resolve(&file.path, directives.mime_type.as_deref());
    let attachment = headers::is_attachment(&content_type, directives.disposition);

    let etag = (directives.validators && !attachment)
        .then(|| cache::generate_etag(&file_name, file.size, file.modified));

    let mut params = HeaderParams {
        content_type: &content_type,
        file_name: &file_name,
        file: &file,
        range: None,
        directives,
        etag: etag.as_deref(),
        now,
    };

    if let Some(ref etag) = etag {
        let if_none_match = header_str(request.headers, &header::IF_NONE_MATCH);
        let if_modified_since = header_str(request.headers, &header::IF_MODIFIED_SINCE);
        if cache::is_not_modified(if_none_match, if_modified_since, etag, file.modified) {
            let header_list = not_modified_headers(&params)?;
            logger::log_debug(&format!("{} not modified", file.path.display()));
            return Ok(PreparedStream {
                file,
                window: None,
                chunk_size: directives.chunk_size,
                envelope: ResponseEnvelope {
                    status: 304,
                    headers: header_list,
                    remaining: 0,
                },
            });
        }
    }

    let range_header = header_str(request.headers, &header::RANGE);
    let (status, window) = match range::parse_range_header(range_header, file.size) {
        RangeParseResult::Valid(r) => {
            params.range = Some(r);
            (206, Some(r))
        }
        RangeParseResult::NotSatisfiable => {
            return Err(ServeError::RangeNotSatisfiable { size: file.size });
        }
        RangeParseResult::None => {
            if request.headers.contains_key(header::RANGE) {
                logger::log_debug(&format!(
                    "Ignoring malformed Range header {range_header:?}, sending full content"
                ));
            }
            (200, ByteRange::full(file.size))
        }
    };

    let header_list = headers::build_headers(&params)
        .map_err(|e| ServeError::Validation(format!("invalid header value: {e}")))?;

    let envelope = ResponseEnvelope {
        status,
        headers: header_list,
        remaining: window.map_or(0, |w| w.len()),
    };

    logger::log_debug(&format!(
        "[{}] {} -> {} {content_type}",
        ServePhase::HeadersBuilt,
        file.path.display(),
        envelope.status
    ));

    Ok(PreparedStream {
        file,
        window,
        chunk_size: directives.chunk_size,
        envelope,
    })
}

/// Prepare, hand the envelope to `commit`, then stream the body
///
/// `commit` is where the caller sends status and headers; it runs only if
/// preparation succeeded.
pub async fn serve<S, F>(
    request: &StreamRequest<'_>,
    sink: &mut S,
    commit: F,
) -> Result<ServeOutcome, ServeError>
where
    S: BodySink,
    F: FnOnce(&ResponseEnvelope),
{
    let prepared = prepare(request).await?;
    commit(prepared.envelope());
    Ok(prepared.stream(sink).await)
}

/// Caching headers sent with a 304
fn not_modified_headers(params: &HeaderParams<'_>) -> Result<HeaderList, ServeError> {
    let mut header_list = headers::build_headers(params)
        .map_err(|e| ServeError::Validation(format!("invalid header value: {e}")))?;
    header_list.retain(|(name, _)| {
        [
            header::EXPIRES,
            header::PRAGMA,
            header::CACHE_CONTROL,
            header::LAST_MODIFIED,
            header::ETAG,
        ]
        .contains(name)
    });
    Ok(header_list)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Decode `%XX` escapes in a display filename; `+` is left alone
///
/// Malformed escapes are kept literally and invalid UTF-8 is replaced.
pub fn decode_file_name(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .and_then(|h| std::str::from_utf8(h).ok());
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}
