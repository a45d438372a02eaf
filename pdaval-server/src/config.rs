//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via PDAVAL_CONFIG)
//! 3. Environment variables

use pdaval_core::{CoreError, DistrictEntry, DistrictTable};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PDAVAL_CONFIG";

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Line protocol server.
    pub network: NetworkConfig,
    /// HTTP gateway.
    pub http: HttpConfig,
    /// District range table source.
    pub districts: DistrictsConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
        self.http.apply_env_overrides();
        self.districts.apply_env_overrides();
        self.metrics.apply_env_overrides();
    }

    /// Checks settings that parse but cannot be served.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.idle_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "network.idle_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.network.max_connections == 0 {
            return Err(ConfigError::Validation(
                "network.max_connections must be at least 1".to_string(),
            ));
        }
        if self.http.enabled {
            if self.http.bind_addr == self.network.bind_addr {
                return Err(ConfigError::Validation(format!(
                    "http.bind_addr and network.bind_addr are both {}",
                    self.http.bind_addr
                )));
            }
            if self.http.max_body_bytes == 0 {
                return Err(ConfigError::Validation(
                    "http.max_body_bytes must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Line protocol server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Idle connection timeout in seconds.
    pub idle_timeout_secs: u64,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, pdaval_protocol::DEFAULT_PORT)),
            idle_timeout_secs: 300,
            max_connections: 1000,
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(addr) = env_parse("PDAVAL_BIND") {
            self.bind_addr = addr;
        }
        if let Some(secs) = env_parse("PDAVAL_IDLE_TIMEOUT") {
            self.idle_timeout_secs = secs;
        }
        if let Some(n) = env_parse("PDAVAL_MAX_CONNECTIONS") {
            self.max_connections = n;
        }
    }

    /// Returns idle timeout as Duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Value of the `Access-Control-Allow-Origin` header.
    pub allow_origin: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, pdaval_protocol::DEFAULT_HTTP_PORT)),
            max_body_bytes: 4096,
            allow_origin: "*".to_string(),
        }
    }
}

impl HttpConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(enabled) = env_flag("PDAVAL_HTTP_ENABLED") {
            self.enabled = enabled;
        }
        if let Some(addr) = env_parse("PDAVAL_HTTP_BIND") {
            self.bind_addr = addr;
        }
        if let Some(max) = env_parse("PDAVAL_HTTP_MAX_BODY") {
            self.max_body_bytes = max;
        }
        if let Ok(origin) = std::env::var("PDAVAL_ALLOW_ORIGIN") {
            if !origin.is_empty() {
                self.allow_origin = origin;
            }
        }
    }
}

/// Where the district range table comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DistrictsConfig {
    /// YAML list of district entries replacing the built-in table.
    pub file: Option<PathBuf>,
}

impl DistrictsConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("PDAVAL_DISTRICTS_FILE") {
            self.file = Some(PathBuf::from(path));
        }
    }

    /// Builds the district table, falling back to the built-in one.
    pub fn load_table(&self) -> Result<Arc<DistrictTable>, ConfigError> {
        let Some(path) = &self.file else {
            return Ok(DistrictTable::builtin());
        };

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.clone(), e))?;
        let entries: Vec<DistrictEntry> = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.clone(), e.to_string()))?;
        let table =
            DistrictTable::new(entries).map_err(|e| ConfigError::Districts(path.clone(), e))?;

        tracing::info!("Loaded {} districts from {}", table.len(), path.display());
        Ok(Arc::new(table))
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve `/metrics` from the HTTP gateway.
    pub enabled: bool,
}

impl MetricsConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(enabled) = env_flag("PDAVAL_METRICS_ENABLED") {
            self.enabled = enabled;
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{}': {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse '{}': {1}", .0.display())]
    Parse(PathBuf, String),

    #[error("invalid district table in '{}': {1}", .0.display())]
    Districts(PathBuf, #[source] CoreError),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("ignoring unparsable {}={}", name, value);
            None
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Custom serde module for SocketAddr (to handle as string in YAML).
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
