// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

use crate::http::headers::{Disposition, StreamingDirectives};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound on a whole connection, in seconds (0 disables)
    pub connection_timeout: u64,
    /// Chunks buffered between the file reader and the connection
    pub channel_depth: usize,
    pub max_connections: Option<u64>,
}

/// Defaults applied to every streamed file
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamingConfig {
    pub chunk_size: usize,
    pub cache_seconds: u64,
    pub validators: bool,
}

/// URL prefix served from a directory
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct MountConfig {
    /// URL prefix, e.g. "/downloads"
    pub prefix: String,
    /// Directory the prefix maps to
    pub dir: String,
    #[serde(default)]
    pub disposition: Disposition,
    /// Content-Type for every file under this mount
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl StreamingConfig {
    /// Directives for a file served from `mount`
    pub fn directives_for(&self, mount: &MountConfig) -> StreamingDirectives {
        StreamingDirectives {
            mime_type: mount.mime_type.clone(),
            disposition: mount.disposition,
            chunk_size: self.chunk_size,
            cache_seconds: self.cache_seconds,
            validators: self.validators,
        }
    }
}
