//! Configuration schema and loading.
//!
//! Configuration is layered with figment, lowest to highest priority:
//!
//! 1. Built-in defaults
//! 2. `rill.toml` in the working directory (optional)
//! 3. Environment variables prefixed `RILL_`, with `__` as the section
//!    separator (`RILL_SERVER__PORT=9000` → `server.port = 9000`)
//!
//! Independently of all of this, the bare `port` environment variable is
//! honored by [`ListenerConfig`](rill_core::ListenerConfig) itself when no
//! port is configured; that fallback belongs to the listener contract, not
//! to this loader.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "rill.toml";

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "RILL_";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RillConfig {
    /// Listening socket settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listening socket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on. When absent the listener falls back to the `port`
    /// environment variable, then 8080.
    #[serde(default)]
    pub port: Option<u16>,

    /// Interface address to bind.
    #[serde(default = "default_host")]
    pub host: IpAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: None,
            host: default_host(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level.
    #[serde(default = "default_level")]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Per-module level overrides, e.g. `rill_core = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            filters: HashMap::new(),
        }
    }
}

fn default_level() -> LogLevel {
    LogLevel::Info
}

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debugging detail.
    Debug,
    /// Normal operation.
    Info,
    /// Something looks wrong.
    Warn,
    /// Something is wrong.
    Error,
}

impl LogLevel {
    /// Returns the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, terse output.
    #[default]
    Compact,
    /// Single-line output with full metadata.
    Full,
    /// Multi-line human-oriented output.
    Pretty,
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Extraction or parsing failed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<RillConfig> {
    load_config_from(CONFIG_FILE)
}

/// Loads configuration with an explicit file path.
///
/// The file is optional; defaults and environment variables still apply
/// when it is missing.
pub fn load_config_from(path: impl AsRef<Path>) -> ConfigResult<RillConfig> {
    Figment::from(Serialized::defaults(RillConfig::default()))
        .merge(Toml::file(path.as_ref()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sensible() {
        let config = RillConfig::default();
        assert_eq!(config.server.port, None);
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config: RillConfig = Figment::from(Serialized::defaults(RillConfig::default()))
            .merge(Toml::string(
                r#"
                [server]
                port = 9000
                host = "127.0.0.1"

                [logging]
                level = "debug"
                format = "pretty"

                [logging.filters]
                rill_core = "trace"
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.server.port, Some(9000));
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(
            config.logging.filters.get("rill_core"),
            Some(&LogLevel::Trace)
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config_from("does-not-exist.toml").unwrap();
        assert_eq!(config.server.port, None);
    }

    #[test]
    fn test_level_conversions_round_trip() {
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}
