//! End-to-end behavior of the streaming service against real files

use filestream::http::{Disposition, StreamingDirectives};
use filestream::service::{self, ServeOutcome, StreamRequest};
use filestream::stream::BodySink;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, RANGE};
use std::io;
use std::path::Path;

/// Collects chunks; optionally hangs up after a number of them
#[derive(Default)]
struct CollectSink {
    chunks: Vec<Bytes>,
    hang_up_after: Option<usize>,
}

impl CollectSink {
    fn body(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }
}

impl BodySink for CollectSink {
    async fn write(&mut self, chunk: Bytes) -> io::Result<()> {
        self.chunks.push(chunk);
        Ok(())
    }

    fn is_disconnected(&self) -> bool {
        self.hang_up_after
            .is_some_and(|limit| self.chunks.len() >= limit)
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn write_file(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

fn range(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RANGE, HeaderValue::from_str(value).unwrap());
    headers
}

fn header<'a>(headers: &'a [(hyper::header::HeaderName, HeaderValue)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.as_str() == name)
        .and_then(|(_, v)| v.to_str().ok())
}

#[tokio::test]
async fn full_download_matches_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = pattern(10_000);
    let path = write_file(dir.path(), "photo.png", &data);
    let directives = StreamingDirectives {
        chunk_size: 1000,
        ..StreamingDirectives::default()
    };
    let headers = HeaderMap::new();
    let request = StreamRequest {
        path: &path,
        file_name: "photo.png",
        directives: &directives,
        headers: &headers,
    };

    let mut sink = CollectSink::default();
    let mut committed = None;
    let outcome = service::serve(&request, &mut sink, |env| committed = Some(env.clone()))
        .await
        .unwrap();

    let envelope = committed.unwrap();
    assert_eq!(envelope.status, 200);
    assert_eq!(header(&envelope.headers, "content-type"), Some("image/png"));
    assert_eq!(header(&envelope.headers, "content-length"), Some("10000"));
    assert_eq!(header(&envelope.headers, "accept-ranges"), Some("bytes"));
    assert_eq!(outcome, ServeOutcome::Completed { bytes_sent: 10_000 });
    assert_eq!(sink.chunks.len(), 10);
    assert!(sink.chunks.iter().all(|c| c.len() <= 1000));
    assert_eq!(sink.body(), data);
}

#[tokio::test]
async fn partial_download_returns_window() {
    let dir = tempfile::tempdir().unwrap();
    let data = pattern(10_000);
    let path = write_file(dir.path(), "photo.png", &data);
    let directives = StreamingDirectives::default();
    let headers = range("bytes=9000-");
    let request = StreamRequest {
        path: &path,
        file_name: "photo.png",
        directives: &directives,
        headers: &headers,
    };

    let prepared = service::prepare(&request).await.unwrap();
    let envelope = prepared.envelope().clone();
    assert_eq!(envelope.status, 206);
    assert_eq!(header(&envelope.headers, "content-length"), Some("1000"));
    assert_eq!(
        header(&envelope.headers, "content-range"),
        Some("bytes 9000-9999/10000")
    );

    let mut sink = CollectSink::default();
    let outcome = prepared.stream(&mut sink).await;
    assert_eq!(outcome.bytes_sent(), 1000);
    assert_eq!(sink.body(), &data[9000..]);
}

#[tokio::test]
async fn end_past_file_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let data = pattern(500);
    let path = write_file(dir.path(), "notes.txt", &data);
    let directives = StreamingDirectives::default();
    let headers = range("bytes=100-99999");
    let request = StreamRequest {
        path: &path,
        file_name: "notes.txt",
        directives: &directives,
        headers: &headers,
    };

    let prepared = service::prepare(&request).await.unwrap();
    assert_eq!(
        header(&prepared.envelope().headers, "content-range"),
        Some("bytes 100-499/500")
    );
    let mut sink = CollectSink::default();
    prepared.stream(&mut sink).await;
    assert_eq!(sink.body(), &data[100..]);
}

#[tokio::test]
async fn malformed_range_sends_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "a.txt", b"hello world");
    let directives = StreamingDirectives::default();
    let headers = range("items=0-3");
    let request = StreamRequest {
        path: &path,
        file_name: "a.txt",
        directives: &directives,
        headers: &headers,
    };

    let prepared = service::prepare(&request).await.unwrap();
    assert_eq!(prepared.envelope().status, 200);
    assert_eq!(prepared.envelope().remaining, 11);
}

#[tokio::test]
async fn unknown_type_is_forced_download() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "blob.xyz", b"data");
    let directives = StreamingDirectives::default();
    let headers = HeaderMap::new();
    let request = StreamRequest {
        path: &path,
        file_name: "my%20blob.xyz",
        directives: &directives,
        headers: &headers,
    };

    let prepared = service::prepare(&request).await.unwrap();
    let h = &prepared.envelope().headers;
    assert_eq!(header(h, "content-type"), Some("application/force-download"));
    assert_eq!(
        header(h, "content-disposition"),
        Some("attachment; filename=\"my blob.xyz\"")
    );
    assert_eq!(header(h, "expires"), Some("Mon, 23 Jul 1997 05:00:00 GMT"));
}

#[tokio::test]
async fn mime_override_and_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "report", b"%PDF-1.4");
    let directives = StreamingDirectives {
        mime_type: Some("application/pdf".to_string()),
        disposition: Disposition::Attachment,
        ..StreamingDirectives::default()
    };
    let headers = HeaderMap::new();
    let request = StreamRequest {
        path: &path,
        file_name: "report.pdf",
        directives: &directives,
        headers: &headers,
    };

    let prepared = service::prepare(&request).await.unwrap();
    let h = &prepared.envelope().headers;
    assert_eq!(header(h, "content-type"), Some("application/pdf"));
    assert_eq!(
        header(h, "content-disposition"),
        Some("attachment; filename=\"report.pdf\"")
    );
    assert_eq!(header(h, "cache-control"), Some("private"));
}

#[tokio::test]
async fn disconnect_stops_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "big.bin", &pattern(100_000));
    let directives = StreamingDirectives {
        chunk_size: 1024,
        ..StreamingDirectives::default()
    };
    let headers = HeaderMap::new();
    let request = StreamRequest {
        path: &path,
        file_name: "big.bin",
        directives: &directives,
        headers: &headers,
    };

    let mut sink = CollectSink {
        hang_up_after: Some(3),
        ..CollectSink::default()
    };
    let outcome = service::serve(&request, &mut sink, |_| {}).await.unwrap();
    assert_eq!(outcome, ServeOutcome::Aborted { bytes_sent: 3 * 1024 });
    assert_eq!(sink.chunks.len(), 3);
}

#[tokio::test]
async fn errors_before_commit_leave_connection_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "small.txt", b"0123456789");
    let directives = StreamingDirectives::default();

    let headers = range("bytes=10-");
    let request = StreamRequest {
        path: &path,
        file_name: "small.txt",
        directives: &directives,
        headers: &headers,
    };
    let mut sink = CollectSink::default();
    let mut committed = false;
    let err = service::serve(&request, &mut sink, |_| committed = true)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 416);
    assert!(!committed);
    assert!(sink.chunks.is_empty());

    let missing = dir.path().join("missing.txt");
    let no_range = HeaderMap::new();
    let request = StreamRequest {
        path: &missing,
        file_name: "missing.txt",
        directives: &directives,
        headers: &no_range,
    };
    let err = service::serve(&request, &mut sink, |_| committed = true)
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 404);
    assert!(!committed);
}
