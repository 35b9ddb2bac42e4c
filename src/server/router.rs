//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, mount
//! lookup, path resolution and handing the file to the streaming service.

use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::sink::channel_body;
use crate::config::{Config, MountConfig};
use crate::http::{self, response, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use crate::service::{self, ServeOutcome, ServePhase, StreamRequest};

/// Request details kept for the access log
struct RequestContext {
    entry: AccessLogEntry,
    started: Instant,
}

impl RequestContext {
    fn new<B>(req: &Request<B>, peer_addr: SocketAddr) -> Self {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.http_version = version_label(req.version()).to_string();
        entry.range = header_string(req, &hyper::header::RANGE);
        entry.referer = header_string(req, &hyper::header::REFERER);
        entry.user_agent = header_string(req, &hyper::header::USER_AGENT);
        Self {
            entry,
            started: Instant::now(),
        }
    }

    fn finish(
        mut self,
        config: &Config,
        status: u16,
        body_bytes: u64,
        outcome: Option<&'static str>,
    ) {
        if !config.logging.access_log {
            return;
        }
        self.entry.status = status;
        self.entry.body_bytes = body_bytes;
        self.entry.outcome = outcome;
        self.entry.request_time_us =
            u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&self.entry, &config.logging.access_log_format);
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    config: Arc<Config>,
    peer_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let ctx = RequestContext::new(&req, peer_addr);

    // 1. Check HTTP method
    let is_head = match *req.method() {
        Method::GET => false,
        Method::HEAD => true,
        _ => {
            logger::log_warning(&format!("Method not allowed: {}", req.method()));
            ctx.finish(&config, 405, 0, None);
            return Ok(http::build_405_response());
        }
    };

    // 2. Find the mount and the file behind it
    let url_path = req.uri().path();
    let Some(mount) = config.find_mount(url_path) else {
        ctx.finish(&config, 404, 0, None);
        return Ok(http::build_404_response());
    };
    let file_name = url_path.rsplit('/').next().unwrap_or_default();
    if file_name.is_empty() {
        ctx.finish(&config, 404, 0, None);
        return Ok(http::build_404_response());
    }
    let Some(file_path) = resolve_file_path(mount, url_path).await else {
        ctx.finish(&config, 404, 0, None);
        return Ok(http::build_404_response());
    };

    // 3. Prepare headers (pre-commit)
    let directives = config.streaming.directives_for(mount);
    let request = StreamRequest {
        path: &file_path,
        file_name,
        directives: &directives,
        headers: req.headers(),
    };

    let prepared = match service::prepare(&request).await {
        Ok(prepared) => prepared,
        Err(e) => {
            logger::log_debug(&format!("{url_path}: {e}"));
            let resp = http::build_error_response(&e);
            ctx.finish(&config, resp.status().as_u16(), 0, None);
            return Ok(resp);
        }
    };

    let status = prepared.envelope().status;
    if is_head || prepared.envelope().remaining == 0 {
        ctx.finish(&config, status, 0, Some(ServePhase::Completed.as_str()));
        return Ok(http::build_envelope_response(
            prepared.envelope(),
            response::empty_body(),
        ));
    }

    // 4. Commit headers and stream the body from a separate task
    let (mut sink, body) = channel_body(config.performance.channel_depth);
    let resp = http::build_envelope_response(prepared.envelope(), body);

    tokio::spawn(async move {
        let outcome = prepared.stream(&mut sink).await;
        if outcome == ServeOutcome::Failed {
            sink.fail("file read failed").await;
        }
        ctx.finish(
            &config,
            status,
            outcome.bytes_sent(),
            Some(outcome.phase().as_str()),
        );
    });

    Ok(resp)
}

/// Map a URL path under `mount` to a file inside the mount directory
///
/// Rejects `..` segments, anything that resolves (through symlinks) outside
/// the directory, and anything that is not a regular file. Symlinks inside
/// the mount are returned unresolved.
pub async fn resolve_file_path(mount: &MountConfig, url_path: &str) -> Option<PathBuf> {
    let prefix = mount.prefix.trim_end_matches('/');
    let relative = url_path.strip_prefix(prefix)?.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let decoded = service::decode_file_name(relative);
    let relative = Path::new(&decoded);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        logger::log_warning(&format!("Path traversal attempt blocked: {url_path}"));
        return None;
    }

    let dir = match tokio::fs::canonicalize(&mount.dir).await {
        Ok(dir) => dir,
        Err(e) => {
            logger::log_warning(&format!(
                "Mount directory not found or inaccessible '{}': {e}",
                mount.dir
            ));
            return None;
        }
    };

    // Missing files are common (404), no need to log
    let file_path = dir.join(relative);
    let target = tokio::fs::canonicalize(&file_path).await.ok()?;
    if !target.starts_with(&dir) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            url_path,
            target.display()
        ));
        return None;
    }
    if !tokio::fs::metadata(&target).await.is_ok_and(|m| m.is_file()) {
        return None;
    }

    // The link name, not its target, decides the MIME type
    Some(file_path)
}

fn header_string<B>(req: &Request<B>, name: &hyper::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
}
