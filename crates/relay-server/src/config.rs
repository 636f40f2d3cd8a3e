//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (RELAY_HOST, RELAY_PORT)
//! - TOML configuration file

use anyhow::{ensure, Context, Result};
use plotrelay_core::HubConfig;
use plotrelay_protocol::{MAX_ENVELOPE_SIZE, OBSERVER_PATH, PROVIDER_PATH};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Path of the health check route.
pub const HEALTH_PATH: &str = "/health";

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Endpoint paths.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Hub behaviour.
    #[serde(default)]
    pub hub: HubSettings,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Endpoint paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Path providers connect to.
    #[serde(default = "default_provider_path")]
    pub provider_path: String,

    /// Path observers connect to.
    #[serde(default = "default_observer_path")]
    pub observer_path: String,
}

/// Hub behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubSettings {
    /// Give up on an observer write after this many milliseconds.
    /// Unset means writes are never cut short.
    #[serde(default)]
    pub write_timeout_ms: Option<u64>,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("RELAY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("RELAY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
}

fn default_true() -> bool {
    true
}

fn default_provider_path() -> String {
    PROVIDER_PATH.to_string()
}

fn default_observer_path() -> String {
    OBSERVER_PATH.to_string()
}

fn default_max_message_size() -> usize {
    MAX_ENVELOPE_SIZE
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            endpoints: EndpointsConfig::default(),
            hub: HubSettings::default(),
            limits: LimitsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            provider_path: default_provider_path(),
            observer_path: default_observer_path(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl HubSettings {
    /// Build the hub configuration.
    #[must_use]
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            write_timeout: self.write_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        // Try to load from default paths
        let config_paths = [
            "relay.toml",
            "/etc/relay/relay.toml",
            "~/.config/relay/relay.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check values the router and transports cannot recover from.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint path does not start with `/`, if two
    /// routes share a path, or if the message limit is zero.
    pub fn validate(&self) -> Result<()> {
        let provider = &self.endpoints.provider_path;
        let observer = &self.endpoints.observer_path;

        for path in [provider, observer] {
            ensure!(
                path.starts_with('/'),
                "Endpoint path must start with '/': {:?}",
                path
            );
            ensure!(
                path != HEALTH_PATH,
                "Endpoint path {:?} is reserved for the health check",
                path
            );
        }
        ensure!(
            provider != observer,
            "Provider and observer endpoints must differ, both are {:?}",
            provider
        );
        ensure!(
            self.limits.max_message_size > 0,
            "limits.max_message_size must be greater than zero"
        );

        Ok(())
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if `host:port` is not a valid socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address: {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.endpoints.provider_path, "/provider");
        assert_eq!(config.endpoints.observer_path, "/observer");
        assert_eq!(config.limits.max_message_size, MAX_ENVELOPE_SIZE);
        assert!(config.validate().is_ok());
        assert!(config.hub.write_timeout_ms.is_none());
        assert!(config.hub.hub_config().write_timeout.is_none());
    }

    #[test]
    fn test_config_bind_addr() {
        let config: Config = toml::from_str("host = \"127.0.0.1\"\nport = 8080").unwrap();
        let addr = config.bind_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_invalid_bind_addr() {
        let config: Config = toml::from_str("host = \"not a host\"\nport = 1").unwrap();
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"
            port = 9000

            [endpoints]
            observer_path = "/watch"

            [hub]
            write_timeout_ms = 250

            [metrics]
            enabled = false
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.endpoints.provider_path, "/provider");
        assert_eq!(config.endpoints.observer_path, "/watch");
        assert_eq!(
            config.hub.hub_config().write_timeout,
            Some(Duration::from_millis(250))
        );
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_endpoint_paths_must_start_with_slash() {
        let config: Config = toml::from_str(
            r#"
            [endpoints]
            provider_path = "provider"
        "#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }

    #[test]
    fn test_endpoint_paths_must_differ() {
        let config: Config = toml::from_str(
            r#"
            [endpoints]
            provider_path = "/plots"
            observer_path = "/plots"
        "#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_endpoint_path_cannot_shadow_health() {
        let mut config = Config::default();
        config.endpoints.observer_path = HEALTH_PATH.to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_message_limit_is_rejected() {
        let mut config = Config::default();
        config.limits.max_message_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_rejects_invalid_endpoints() {
        let path = std::env::temp_dir().join(format!(
            "relay-config-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[endpoints]\nprovider_path = \"/same\"\nobserver_path = \"/same\"\n",
        )
        .unwrap();

        let result = Config::from_file(&path);
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("must differ"));
    }

    #[test]
    fn test_config_from_missing_file() {
        assert!(Config::from_file("/nonexistent/relay.toml").is_err());
    }
}
