// Configuration module entry point
// Loads layered configuration: defaults, optional file, environment

mod types;

use std::net::SocketAddr;

pub use types::{
    Config, LoggingConfig, MountConfig, PerformanceConfig, ServerConfig, StreamingConfig,
};

/// Config file used when no path is given (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional. `FILESTREAM_*` environment variables override it,
    /// with `__` separating nested keys (`FILESTREAM_SERVER__PORT=9000`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FILESTREAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 0)?
            .set_default("performance.channel_depth", 4)?
            .set_default("streaming.chunk_size", 4096)?
            .set_default("streaming.cache_seconds", 2_592_000)?
            .set_default("streaming.validators", false)?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.server.workers == Some(0) {
            return Err(config::ConfigError::Message(
                "server.workers must be positive when set".to_string(),
            ));
        }
        if self.streaming.chunk_size == 0 {
            return Err(config::ConfigError::Message(
                "streaming.chunk_size must be positive".to_string(),
            ));
        }
        if self.performance.channel_depth == 0 {
            return Err(config::ConfigError::Message(
                "performance.channel_depth must be positive".to_string(),
            ));
        }
        if let Some(mount) = self.mounts.iter().find(|m| !m.prefix.starts_with('/')) {
            return Err(config::ConfigError::Message(format!(
                "mount prefix '{}' must start with '/'",
                mount.prefix
            )));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Longest mount prefix matching `path`, on a path segment boundary
    pub fn find_mount(&self, path: &str) -> Option<&MountConfig> {
        self.mounts
            .iter()
            .filter(|m| {
                let prefix = m.prefix.trim_end_matches('/');
                path.strip_prefix(prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .max_by_key(|m| m.prefix.trim_end_matches('/').len())
    }
}
