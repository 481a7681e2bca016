use crate::global;
use crate::stats::BalanceThresholds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub tracker: TrackerConfig,
    pub sink: SinkConfig,
    pub api: ApiConfig,
    pub balance: BalanceThresholds,
}

/// Default identity used when a start request omits names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub meeting_name: String,
    pub room_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            meeting_name: "Unnamed meeting".to_string(),
            room_name: "Room 1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Silence window: an open interval closes once no corroborating signal
    /// arrives for this long.
    pub timeout_ms: u64,
    /// Monitor tick period.
    pub tick_interval_ms: u64,
    /// Bank interval durations rounded to whole seconds instead of raw ms.
    pub round_to_seconds: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            tick_interval_ms: 1000,
            round_to_seconds: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Stats backend base URL. Defaults to this instance's own API, so a
    /// standalone room aggregates locally; point several rooms at one
    /// central instance to aggregate across a meeting.
    pub endpoint: String,
    pub push_interval_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("http://127.0.0.1:{}", ApiConfig::default().port),
            push_interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3747 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tracker.timeout_ms, 5000);
        assert_eq!(config.tracker.tick_interval_ms, 1000);
        assert!(!config.tracker.round_to_seconds);
        assert_eq!(config.sink.push_interval_secs, 10);
        assert_eq!(config.api.port, 3747);
        assert_eq!(config.balance.good, 80);
        assert_eq!(config.balance.fair, 60);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [tracker]
            timeout_ms = 10000
            "#,
        )
        .unwrap();
        assert_eq!(config.tracker.timeout_ms, 10000);
        assert_eq!(config.tracker.tick_interval_ms, 1000);
        assert_eq!(config.session.room_name, "Room 1");
    }

    #[test]
    fn test_round_trip() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.api.port, config.api.port);
        assert_eq!(parsed.sink.endpoint, config.sink.endpoint);
    }
}
