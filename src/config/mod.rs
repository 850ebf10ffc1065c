//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Feature namespace advertised and discovered for call negotiation
pub const DEFAULT_CALL_FEATURE: &str = "http://www.xmpp.org/extensions/xep-0166.html#ns";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub coordinator: CoordinatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub watchdog_threshold_secs: u64,
    pub watchdog_poll_interval_ms: u64,
    pub discovery_timeout_ms: u64,
    /// Discovery attempts before a failure is cached as unsupported
    pub discovery_attempts: u32,
    /// Age after which a cached capability is re-discovered
    pub capability_ttl_secs: Option<u64>,
    pub call_feature: String,
    /// Allow only one session at a time to use the local media device
    pub exclusive_media: bool,
    /// Peers on these domains are transport gateways and never offered calls
    pub gateway_domains: Vec<String>,
    /// Release every session when the signaling connection closes
    pub release_on_disconnect: bool,
    pub command_buffer: usize,
}

impl CoordinatorConfig {
    pub fn watchdog_poll_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_poll_interval_ms.max(1))
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn capability_ttl(&self) -> Option<chrono::Duration> {
        self.capability_ttl_secs.map(|secs| {
            i64::try_from(secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .unwrap_or(chrono::Duration::MAX)
        })
    }

    pub fn is_gateway(&self, domain: &str) -> bool {
        self.gateway_domains
            .iter()
            .any(|gateway| gateway.eq_ignore_ascii_case(domain))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            watchdog_threshold_secs: crate::domain::watchdog::DEFAULT_THRESHOLD_SECS,
            watchdog_poll_interval_ms: 500,
            discovery_timeout_ms: 10_000,
            discovery_attempts: 1,
            capability_ttl_secs: None,
            call_feature: DEFAULT_CALL_FEATURE.to_string(),
            exclusive_media: true,
            gateway_domains: Vec::new(),
            release_on_disconnect: false,
            command_buffer: 256,
        }
    }
}

impl Config {
    /// Load defaults, then an optional TOML file, then `CALLGATE__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder
            .add_source(
                config::Environment::with_prefix("CALLGATE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.coordinator.watchdog_threshold_secs, 5);
        assert_eq!(config.coordinator.discovery_attempts, 1);
        assert!(config.coordinator.exclusive_media);
        assert!(!config.coordinator.release_on_disconnect);
        assert!(config.coordinator.capability_ttl().is_none());
        assert_eq!(config.coordinator.call_feature, DEFAULT_CALL_FEATURE);
    }

    #[test]
    fn test_capability_ttl_saturates() {
        let coordinator = CoordinatorConfig {
            capability_ttl_secs: Some(u64::MAX),
            ..CoordinatorConfig::default()
        };
        assert_eq!(coordinator.capability_ttl(), Some(chrono::Duration::MAX));

        let coordinator = CoordinatorConfig {
            capability_ttl_secs: Some(90),
            ..CoordinatorConfig::default()
        };
        assert_eq!(coordinator.capability_ttl(), Some(chrono::Duration::seconds(90)));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.coordinator.command_buffer, 256);
    }

    #[test]
    fn test_load_from_toml() {
        let path = std::env::temp_dir().join(format!("callgate-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[coordinator]\nwatchdog_threshold_secs = 9\ngateway_domains = [\"icq.example.com\"]\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.coordinator.watchdog_threshold_secs, 9);
        assert!(config.coordinator.is_gateway("ICQ.example.com"));
        assert_eq!(config.coordinator.discovery_timeout_ms, 10_000);
    }
}
