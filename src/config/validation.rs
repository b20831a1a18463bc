//! Configuration validation.

use crate::bridge::parse_push_url;
use crate::config::Config;

/// Validate the configuration.
///
/// Checks for:
/// - A known log level
/// - An empty push URL, or an `http`/`https` one
/// - A non-empty metric prefix and a non-zero push timeout
/// - A pull path starting with `/`
///
/// # Returns
///
/// `Ok(())` if valid, or an error message describing every problem found.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut errors = Vec::new();

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.global.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "invalid log level '{}', must be one of: {}",
            config.global.log_level,
            valid_levels.join(", ")
        ));
    }

    if let Err(reason) = parse_push_url(&config.bridge.push_url) {
        errors.push(format!(
            "invalid push_url '{}': {}",
            config.bridge.push_url, reason
        ));
    }

    if config.bridge.prefix.is_empty() {
        errors.push("metric prefix cannot be empty".to_string());
    }

    if config.bridge.push_timeout.is_zero() {
        errors.push("push_timeout must be greater than zero".to_string());
    }

    if let Some(hostname) = &config.bridge.hostname {
        if hostname.trim().is_empty() {
            errors.push("hostname override cannot be blank".to_string());
        }
    }

    if !config.server.path.starts_with('/') {
        errors.push(format!(
            "server path '{}' must start with '/'",
            config.server.path
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_valid_config() {
        let mut config = Config::default();
        config.bridge.push_url = "http://127.0.0.1:8080/ingest".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_push_url_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_https_push_url_is_valid() {
        let mut config = Config::default();
        config.bridge.push_url = "https://collector/".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unsupported_push_scheme() {
        let mut config = Config::default();
        config.bridge.push_url = "udp://collector:8125".to_string();
        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("invalid push_url"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.global.log_level = "loud".to_string();
        assert!(validate_config(&config).unwrap_err().contains("invalid log level"));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = Config::default();
        config.bridge.prefix = String::new();
        config.bridge.push_timeout = Duration::ZERO;
        config.bridge.hostname = Some("  ".to_string());
        config.server.path = "metrics".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("prefix cannot be empty"));
        assert!(err.contains("push_timeout"));
        assert!(err.contains("hostname override"));
        assert!(err.contains("must start with '/'"));
    }
}
