//! Configuration loading
//!
//! Layered configuration: built-in defaults, an optional `devserve.toml`
//! file, `DEVSERVE`-prefixed environment variables, and finally the one
//! positional CLI argument (port) on top.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    pub format: String,
    pub access_log_file: Option<String>,
    pub error_log_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
}

impl Config {
    /// Load configuration. `port_override` comes from the positional CLI
    /// argument and wins over file and environment values.
    pub fn load(port_override: Option<u16>) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("devserve").required(false))
            .add_source(config::Environment::with_prefix("DEVSERVE").separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("logging.access_log", true)?
            .set_default("logging.format", "common")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_override_option("server.port", port_override.map(i64::from))?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid listen address: {e}"))
    }
}

/// Immutable per-process state shared by every connection task
pub struct AppState {
    pub config: Config,
    /// Serving root and git working copy: the process working directory,
    /// captured once at startup and never changed.
    pub root: PathBuf,
}

impl AppState {
    pub fn new(config: Config) -> std::io::Result<Self> {
        let root = std::env::current_dir()?;
        Ok(Self { config, root })
    }
}
