//! Console configuration from environment variables.

use std::time::Duration;

use url::Url;

use crate::flash::DEFAULT_FLASH_DURATION;
use crate::ws::ReconnectConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{var} must use one of {expected}, got {scheme}")]
    UnsupportedScheme {
        var: &'static str,
        scheme: String,
        expected: &'static str,
    },
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub socket_url: Url,
    pub api_url: Url,
    pub api_token: Option<String>,
    pub flash_duration: Duration,
    pub reconnect: ReconnectConfig,
}

impl ConsoleConfig {
    /// Read configuration from the process environment.
    ///
    /// Environment variables:
    /// - `DISPATCH_SOCKET_URL`: event channel endpoint (default: "ws://localhost:5000/ws")
    /// - `DISPATCH_API_URL`: REST base URL (default: "http://localhost:5000/api")
    /// - `DISPATCH_API_TOKEN`: bearer token (default: unset)
    /// - `DISPATCH_FLASH_SECS`: flash duration in seconds (default: 5)
    /// - `DISPATCH_RECONNECT_MAX_ATTEMPTS`: 0 retries forever (default: 0)
    /// - `DISPATCH_RECONNECT_INITIAL_MS`: first backoff delay (default: 1000)
    /// - `DISPATCH_RECONNECT_MAX_MS`: backoff ceiling (default: 30000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let socket_url = parse_url(
            "DISPATCH_SOCKET_URL",
            get("DISPATCH_SOCKET_URL").as_deref().unwrap_or("ws://localhost:5000/ws"),
            &["ws", "wss"],
            "ws, wss",
        )?;
        let api_url = parse_url(
            "DISPATCH_API_URL",
            get("DISPATCH_API_URL").as_deref().unwrap_or("http://localhost:5000/api"),
            &["http", "https"],
            "http, https",
        )?;

        let defaults = ReconnectConfig::default();
        let flash_duration = match get("DISPATCH_FLASH_SECS") {
            Some(v) => Duration::from_secs(parse_number::<u64>("DISPATCH_FLASH_SECS", v)?),
            None => DEFAULT_FLASH_DURATION,
        };
        let number_or = |var: &'static str, default: u32| -> Result<u32, ConfigError> {
            get(var).map_or(Ok(default), |v| parse_number(var, v))
        };
        let reconnect = ReconnectConfig {
            max_attempts: number_or("DISPATCH_RECONNECT_MAX_ATTEMPTS", defaults.max_attempts)?,
            initial_delay_ms: number_or("DISPATCH_RECONNECT_INITIAL_MS", defaults.initial_delay_ms)?,
            max_delay_ms: number_or("DISPATCH_RECONNECT_MAX_MS", defaults.max_delay_ms)?,
            ..defaults
        };

        Ok(Self {
            socket_url,
            api_url,
            api_token: get("DISPATCH_API_TOKEN"),
            flash_duration,
            reconnect,
        })
    }
}

fn parse_url(
    var: &'static str,
    value: &str,
    schemes: &[&str],
    expected: &'static str,
) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl { var, source })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::UnsupportedScheme {
            var,
            scheme: url.scheme().to_string(),
            expected,
        });
    }
    Ok(url)
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.socket_url.as_str(), "ws://localhost:5000/ws");
        assert_eq!(config.api_url.as_str(), "http://localhost:5000/api");
        assert_eq!(config.api_token, None);
        assert_eq!(config.flash_duration, Duration::from_secs(5));
        assert_eq!(config.reconnect.max_attempts, 0);
        assert_eq!(config.reconnect.initial_delay_ms, 1000);
        assert_eq!(config.reconnect.max_delay_ms, 30000);
    }

    #[test]
    fn test_overrides() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            ("DISPATCH_SOCKET_URL", "wss://dispatch.example.org/ws"),
            ("DISPATCH_API_TOKEN", " abc "),
            ("DISPATCH_FLASH_SECS", "8"),
            ("DISPATCH_RECONNECT_MAX_ATTEMPTS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.socket_url.host_str(), Some("dispatch.example.org"));
        assert_eq!(config.api_token.as_deref(), Some("abc"));
        assert_eq!(config.flash_duration, Duration::from_secs(8));
        assert_eq!(config.reconnect.max_attempts, 4);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = ConsoleConfig::from_lookup(lookup(&[("DISPATCH_API_TOKEN", "  ")])).unwrap();
        assert_eq!(config.api_token, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            ConsoleConfig::from_lookup(lookup(&[("DISPATCH_SOCKET_URL", "not a url")])),
            Err(ConfigError::InvalidUrl { var: "DISPATCH_SOCKET_URL", .. })
        ));
        assert!(matches!(
            ConsoleConfig::from_lookup(lookup(&[("DISPATCH_SOCKET_URL", "http://localhost/ws")])),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            ConsoleConfig::from_lookup(lookup(&[("DISPATCH_FLASH_SECS", "-1")])),
            Err(ConfigError::InvalidNumber { var: "DISPATCH_FLASH_SECS", .. })
        ));
    }
}
