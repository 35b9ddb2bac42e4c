//! Chunked body streaming module
//!
//! Copies a byte window from a seekable source into a [`BodySink`] in
//! bounded chunks. Memory use is one chunk; the sink is checked for a
//! disconnected client once per chunk.

use hyper::body::Bytes;
use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::http::range::ByteRange;
use crate::logger;

/// Destination for response body bytes (usually a client connection)
pub trait BodySink: Send {
    /// Write one chunk; an error means the client is gone
    fn write(&mut self, chunk: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    /// Cancellation probe, polled before every chunk
    fn is_disconnected(&self) -> bool;
}

/// How a stream ended without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The whole window was written (or the file ended early)
    Completed { bytes_sent: u64 },
    /// The client disconnected part way
    Aborted { bytes_sent: u64 },
}

impl StreamOutcome {
    pub const fn bytes_sent(&self) -> u64 {
        match self {
            Self::Completed { bytes_sent } | Self::Aborted { bytes_sent } => *bytes_sent,
        }
    }
}

/// Open `path` and stream `window` into `sink`
///
/// The file handle lives only for the duration of this call.
pub async fn stream_file<S: BodySink>(
    path: &Path,
    window: Option<ByteRange>,
    chunk_size: usize,
    sink: &mut S,
) -> io::Result<StreamOutcome> {
    let file = File::open(path).await?;
    copy_range(file, window, chunk_size, sink).await
}

/// Stream `window` of `reader` into `sink`
///
/// `reader` is consumed and dropped on every exit path. A `None` window
/// (empty file) writes nothing. Read errors are returned immediately and
/// never retried; bytes already written cannot be taken back.
pub async fn copy_range<R, S>(
    mut reader: R,
    window: Option<ByteRange>,
    chunk_size: usize,
    sink: &mut S,
) -> io::Result<StreamOutcome>
where
    R: AsyncRead + AsyncSeek + Unpin + Send,
    S: BodySink,
{
    let Some(range) = window else {
        return Ok(StreamOutcome::Completed { bytes_sent: 0 });
    };
    if chunk_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "chunk size must be positive",
        ));
    }

    reader.seek(SeekFrom::Start(range.start)).await?;

    let mut buffer = vec![0u8; chunk_size];
    let mut remaining = range.len();
    let mut bytes_sent = 0u64;

    while remaining > 0 {
        if sink.is_disconnected() {
            return Ok(StreamOutcome::Aborted { bytes_sent });
        }

        let want = usize::try_from(remaining).map_or(chunk_size, |r| r.min(chunk_size));
        let n = reader.read(&mut buffer[..want]).await?;
        if n == 0 {
            logger::log_warning(&format!(
                "File ended {remaining} bytes before the expected window end"
            ));
            break;
        }

        if let Err(e) = sink.write(Bytes::copy_from_slice(&buffer[..n])).await {
            logger::log_debug(&format!("Sink closed after {bytes_sent} bytes: {e}"));
            return Ok(StreamOutcome::Aborted { bytes_sent });
        }

        // n <= want <= remaining
        let n = n as u64;
        remaining -= n;
        bytes_sent += n;
    }

    Ok(StreamOutcome::Completed { bytes_sent })
}
