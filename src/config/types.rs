//! Configuration data types.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// What to publish and where
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Pull endpoint
    #[serde(default)]
    pub server: ServerConfig,
}

/// Global configuration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Json,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Bridge settings. Immutable once the bridge is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Collector URL to POST snapshots to; empty disables push
    #[serde(default)]
    pub push_url: String,

    /// Prepended to every metric name
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Reported hostname; resolved from the system when unset
    #[serde(default)]
    pub hostname: Option<String>,

    /// Upper bound on one push request
    #[serde(default = "default_push_timeout", with = "humantime_serde")]
    pub push_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            push_url: String::new(),
            prefix: default_prefix(),
            hostname: None,
            push_timeout: default_push_timeout(),
        }
    }
}

/// Pull endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Whether the pull endpoint is served
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Address to bind
    #[serde(default = "default_server_address")]
    pub address: SocketAddr,

    /// Path serving the snapshot
    #[serde(default = "default_server_path")]
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_server_address(),
            path: default_server_path(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_prefix() -> String {
    "app".to_string()
}

fn default_push_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

fn default_server_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9091))
}

fn default_server_path() -> String {
    "/metrics".to_string()
}

/// Custom serde module for humantime durations.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.global.log_format, LogFormat::Json);
        assert!(config.bridge.push_url.is_empty());
        assert_eq!(config.bridge.push_timeout, Duration::from_secs(5));
        assert_eq!(config.server.path, "/metrics");
        assert!(config.server.enabled);
    }

    #[test]
    fn test_push_timeout_humantime() {
        let bridge: BridgeConfig = serde_yaml::from_str("push_timeout: 750ms").unwrap();
        assert_eq!(bridge.push_timeout, Duration::from_millis(750));
        assert_eq!(bridge.prefix, "app");
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_yaml::from_str("pretty").unwrap();
        assert_eq!(format, LogFormat::Pretty);
    }
}
