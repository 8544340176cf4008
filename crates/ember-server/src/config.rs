//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (EMBER_*)
//! - TOML configuration file

use anyhow::{ensure, Context, Result};
use ember_core::{AuthMode, HubConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Channel admission policy.
    #[serde(default)]
    pub auth: AuthSetting,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Long-poll timing.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Channel lifetime.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Channel admission policy, as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthSetting {
    /// Any `sub` may create and join channels.
    #[default]
    None,
    /// Channels are created by `sign` and joined with a token.
    Token,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of concurrently live channels.
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,

    /// Maximum parked subscribers per channel.
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers_per_channel: usize,

    /// Recent messages buffered per channel.
    #[serde(default = "default_channel_buffer_size")]
    pub channel_buffer_size: usize,
}

/// Long-poll timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds a parked poll may idle before it is nooped.
    #[serde(default = "default_polling_timeout")]
    pub timeout_secs: u32,

    /// Sweeper cadence in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u32,
}

/// Channel lifetime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Seconds an empty channel stays live; also the default `sign`
    /// expiry.
    #[serde(default = "default_channel_timeout")]
    pub timeout_secs: u32,
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
    std::env::var("EMBER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("EMBER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8100)
}

fn default_true() -> bool {
    true
}

fn default_max_channels() -> usize {
    10_000
}

fn default_max_subscribers() -> usize {
    64
}

fn default_channel_buffer_size() -> usize {
    10
}

fn default_polling_timeout() -> u32 {
    60
}

fn default_check_interval() -> u32 {
    3
}

fn default_channel_timeout() -> u32 {
    120
}

fn default_metrics_port() -> u16 {
    9100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth: AuthSetting::default(),
            limits: LimitsConfig::default(),
            polling: PollingConfig::default(),
            channel: ChannelConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_channels: default_max_channels(),
            max_subscribers_per_channel: default_max_subscribers(),
            channel_buffer_size: default_channel_buffer_size(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_polling_timeout(),
            check_interval_secs: default_check_interval(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_channel_timeout(),
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

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "ember.toml",
            "/etc/ember/ember.toml",
            "~/.config/ember/ember.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
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

        Ok(config)
    }

    /// Reject configurations the relay cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.limits.max_channels > 0, "limits.max_channels must be > 0");
        ensure!(
            self.limits.channel_buffer_size > 0,
            "limits.channel_buffer_size must be > 0"
        );
        ensure!(
            self.polling.check_interval_secs > 0,
            "polling.check_interval_secs must be > 0"
        );
        ensure!(self.polling.timeout_secs > 0, "polling.timeout_secs must be > 0");
        ensure!(self.channel.timeout_secs > 0, "channel.timeout_secs must be > 0");
        Ok(())
    }

    /// The hub configuration this server configuration describes.
    ///
    /// Idle budgets are the timeouts divided by the sweeper cadence, with a
    /// floor of one tick.
    #[must_use]
    pub fn hub_config(&self) -> HubConfig {
        let interval = self.polling.check_interval_secs.max(1);
        HubConfig {
            max_channels: self.limits.max_channels,
            max_subscribers_per_channel: self.limits.max_subscribers_per_channel,
            channel_buffer_size: self.limits.channel_buffer_size,
            polling_timeout: self.polling.timeout_secs,
            polling_idles: (self.polling.timeout_secs / interval).max(1),
            channel_timeout: self.channel.timeout_secs as i32,
            channel_idles: ((self.channel.timeout_secs / interval).max(1)) as i32,
            check_interval: interval,
            auth: match self.auth {
                AuthSetting::None => AuthMode::None,
                AuthSetting::Token => AuthMode::Token,
            },
        }
    }

    /// Sweeper cadence.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.polling.check_interval_secs.max(1)))
    }

    /// Get the socket address to bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid host:port")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8100);
        assert_eq!(config.auth, AuthSetting::None);
        assert!(config.metrics.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_bind_addr() {
        let config = Config::default();
        let addr = config.bind_addr();
        assert_eq!(addr.port(), 8100);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"
            port = 8200
            auth = "token"

            [limits]
            max_channels = 500

            [polling]
            timeout_secs = 30
            check_interval_secs = 1
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8200);
        assert_eq!(config.auth, AuthSetting::Token);
        assert_eq!(config.limits.max_channels, 500);
        assert_eq!(config.polling.timeout_secs, 30);
    }

    #[test]
    fn test_hub_config_derivation() {
        let mut config = Config::default();
        config.polling.timeout_secs = 60;
        config.polling.check_interval_secs = 3;
        config.channel.timeout_secs = 120;
        config.auth = AuthSetting::Token;

        let hub = config.hub_config();
        assert_eq!(hub.polling_idles, 20);
        assert_eq!(hub.channel_idles, 40);
        assert_eq!(hub.check_interval, 3);
        assert_eq!(hub.auth, AuthMode::Token);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.polling.check_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
