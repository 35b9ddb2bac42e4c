//! Range-aware file streaming over HTTP
//!
//! Serves files from configured directories with the headers browsers and
//! download managers expect: single byte ranges (206), inline or attachment
//! disposition, cache headers and optional validators. Bodies are read in
//! fixed-size chunks and stop as soon as the client goes away.

pub mod config;
pub mod error;
pub mod file;
pub mod http;
pub mod logger;
pub mod server;
pub mod service;
pub mod stream;
