//! Requests against a live server on an ephemeral port

use filestream::config::{
    Config, LoggingConfig, MountConfig, PerformanceConfig, ServerConfig, StreamingConfig,
};
use filestream::http::Disposition;
use filestream::server;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_config(dir: &Path) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: None,
        },
        logging: LoggingConfig {
            level: "error".to_string(),
            access_log: false,
            access_log_format: "combined".to_string(),
            access_log_file: None,
            error_log_file: None,
        },
        performance: PerformanceConfig {
            keep_alive: true,
            connection_timeout: 10,
            channel_depth: 2,
            max_connections: None,
        },
        streaming: StreamingConfig {
            chunk_size: 512,
            cache_seconds: 60,
            validators: true,
        },
        mounts: vec![MountConfig {
            prefix: "/files".to_string(),
            dir: dir.to_str().unwrap().to_string(),
            disposition: Disposition::Inline,
            mime_type: None,
        }],
    }
}

async fn start(dir: &Path) -> SocketAddr {
    let listener = server::create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();
    let config = Arc::new(test_config(dir));
    tokio::spawn(server::run(listener, config, std::future::pending()));
    addr
}

/// Send a raw request and split the reply into head and body
async fn request(addr: SocketAddr, raw: &str) -> (String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();

    let split = reply
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response head");
    let head = String::from_utf8(reply[..split].to_vec()).unwrap();
    (head, reply[split + 4..].to_vec())
}

fn get(path: &str, extra: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n{extra}\r\n")
}

fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (n, v) = line.split_once(':')?;
        n.eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

#[tokio::test]
async fn serves_full_and_partial_content() {
    let dir = tempfile::tempdir().unwrap();
    let data: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
    std::fs::write(dir.path().join("image.png"), &data).unwrap();
    let addr = start(dir.path()).await;

    let (head, body) = request(addr, &get("/files/image.png", "")).await;
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");
    assert_eq!(header_value(&head, "content-type"), Some("image/png"));
    assert_eq!(header_value(&head, "content-length"), Some("5000"));
    assert_eq!(header_value(&head, "cache-control"), Some("max-age=60"));
    assert!(header_value(&head, "etag").is_some());
    assert_eq!(body, data);

    let (head, body) = request(addr, &get("/files/image.png", "Range: bytes=1000-1999\r\n")).await;
    assert!(head.starts_with("HTTP/1.1 206"), "{head}");
    assert_eq!(
        header_value(&head, "content-range"),
        Some("bytes 1000-1999/5000")
    );
    assert_eq!(body, &data[1000..2000]);
}

#[tokio::test]
async fn unsatisfiable_range_and_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"short").unwrap();
    let addr = start(dir.path()).await;

    let (head, _) = request(addr, &get("/files/a.txt", "Range: bytes=50-\r\n")).await;
    assert!(head.starts_with("HTTP/1.1 416"), "{head}");
    assert_eq!(header_value(&head, "content-range"), Some("bytes */5"));

    let (head, _) = request(addr, &get("/files/missing.txt", "")).await;
    assert!(head.starts_with("HTTP/1.1 404"), "{head}");

    let (head, _) = request(addr, &get("/elsewhere/a.txt", "")).await;
    assert!(head.starts_with("HTTP/1.1 404"), "{head}");
}

#[tokio::test]
async fn head_and_method_checks() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
    let addr = start(dir.path()).await;

    let (head, body) = request(
        addr,
        "HEAD /files/a.txt HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");
    assert_eq!(header_value(&head, "content-length"), Some("5"));
    assert!(body.is_empty());

    let (head, _) = request(
        addr,
        "DELETE /files/a.txt HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(head.starts_with("HTTP/1.1 405"), "{head}");
    assert_eq!(header_value(&head, "allow"), Some("GET, HEAD"));
}

#[tokio::test]
async fn matching_etag_gets_not_modified() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("style.css"), b"body{}").unwrap();
    let addr = start(dir.path()).await;

    let (head, _) = request(addr, &get("/files/style.css", "")).await;
    let etag = header_value(&head, "etag").unwrap().to_string();

    let (head, body) = request(
        addr,
        &get("/files/style.css", &format!("If-None-Match: {etag}\r\n")),
    )
    .await;
    assert!(head.starts_with("HTTP/1.1 304"), "{head}");
    assert_eq!(header_value(&head, "etag"), Some(etag.as_str()));
    assert!(body.is_empty());
}

/// Header names of the reply, lowercased, in wire order, limited to `wanted`
fn header_order(head: &str, wanted: &[&str]) -> Vec<String> {
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, _)| name.trim().to_ascii_lowercase())
        .filter(|name| wanted.contains(&name.as_str()))
        .collect()
}

#[tokio::test]
async fn header_order_on_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("image.png"), [1u8; 300]).unwrap();
    std::fs::write(dir.path().join("blob.xyz"), [2u8; 300]).unwrap();
    let addr = start(dir.path()).await;

    let inline = [
        "content-type",
        "expires",
        "pragma",
        "cache-control",
        "last-modified",
        "etag",
        "accept-ranges",
        "content-length",
        "content-range",
    ];
    let (head, _) = request(addr, &get("/files/image.png", "Range: bytes=10-19\r\n")).await;
    assert!(head.starts_with("HTTP/1.1 206"), "{head}");
    assert_eq!(header_order(&head, &inline), inline);

    let attachment = [
        "content-type",
        "content-disposition",
        "content-transfer-encoding",
        "cache-control",
        "pragma",
        "expires",
        "accept-ranges",
        "content-length",
    ];
    let (head, _) = request(addr, &get("/files/blob.xyz", "")).await;
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");
    assert_eq!(header_order(&head, &attachment), attachment);
    assert!(header_value(&head, "etag").is_none());
}

#[tokio::test]
async fn trailing_slash_on_directory_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/a.txt"), b"x").unwrap();
    let addr = start(dir.path()).await;

    let (head, _) = request(addr, &get("/files/sub/", "")).await;
    assert!(head.starts_with("HTTP/1.1 404"), "{head}");

    let (head, _) = request(addr, &get("/files/sub", "")).await;
    assert!(head.starts_with("HTTP/1.1 404"), "{head}");
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_type_comes_from_link_name() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("blob0001"), b"\x89PNG\r\n").unwrap();
    std::os::unix::fs::symlink(dir.path().join("blob0001"), dir.path().join("photo.png")).unwrap();
    let addr = start(dir.path()).await;

    let (head, body) = request(addr, &get("/files/photo.png", "")).await;
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");
    assert_eq!(header_value(&head, "content-type"), Some("image/png"));
    assert!(header_value(&head, "content-disposition").is_none());
    assert_eq!(header_value(&head, "cache-control"), Some("max-age=60"));
    assert_eq!(body, b"\x89PNG\r\n");
}
