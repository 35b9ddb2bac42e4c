//! HTTP response building module
//!
//! Turns envelopes and pre-commit errors into hyper responses.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::Response;
use std::io;

use crate::error::ServeError;
use crate::logger;
use crate::service::ResponseEnvelope;

/// Body type shared by every response the server produces
pub type ResponseBody = BoxBody<Bytes, io::Error>;

/// Fixed in-memory body
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// Body with no content (HEAD, 304)
pub fn empty_body() -> ResponseBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// Build a response carrying the envelope's status and ordered headers
pub fn build_envelope_response(envelope: &ResponseEnvelope, body: ResponseBody) -> Response<ResponseBody> {
    let mut builder = Response::builder().status(envelope.status);
    for (name, value) in &envelope.headers {
        builder = builder.header(name, value);
    }
    builder.body(body).unwrap_or_else(|e| {
        log_build_error(&envelope.status.to_string(), &e);
        Response::new(empty_body())
    })
}

/// Build the response for an error raised before anything was committed
pub fn build_error_response(error: &ServeError) -> Response<ResponseBody> {
    let status = error.http_status();
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", "text/plain");

    let body = match error {
        ServeError::RangeNotSatisfiable { size } => {
            builder = builder.header("Content-Range", format!("bytes */{size}"));
            "416 Range Not Satisfiable"
        }
        ServeError::Validation(_) => "400 Bad Request",
        ServeError::NotReadable { .. } if status == 403 => "403 Forbidden",
        ServeError::NotReadable { .. } => "404 Not Found",
    };

    builder.body(full_body(body)).unwrap_or_else(|e| {
        log_build_error(&status.to_string(), &e);
        Response::new(full_body(body))
    })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain")
        .body(full_body("404 Not Found"))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(full_body("404 Not Found"))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", "GET, HEAD")
        .body(full_body("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(full_body("405 Method Not Allowed"))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
