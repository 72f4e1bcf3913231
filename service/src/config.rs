//! Runtime configuration
//!
//! Timing and link preferences of the pipeline. Every field has a default so
//! an empty JSON object is a valid configuration. Window size and queue
//! capacity are compile-time constants of the shared crate.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use shared::link::DEFAULT_MTU;

use crate::error::ConfigError;

/// Configuration for the sensor link pipeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Interval between two samples of a window in milliseconds
    pub sample_interval_ms: u64,
    /// Pause after every delivery attempt in milliseconds
    pub notify_cooldown_ms: u64,
    /// Delay between the PHY and data length requests in milliseconds
    pub settle_delay_ms: u64,
    /// ATT MTU requested during the exchange
    pub preferred_mtu: u16,
    /// Advertised device name
    pub device_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: shared::SAMPLE_INTERVAL_MS,
            notify_cooldown_ms: shared::NOTIFY_COOLDOWN_MS,
            settle_delay_ms: shared::SETTLE_DELAY_MS,
            preferred_mtu: 247,
            device_name: "SensorLink".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("sample_interval_ms must be non-zero"));
        }
        if self.window_millis().is_none() {
            return Err(ConfigError::Invalid("sample_interval_ms too large"));
        }
        if self.notify_cooldown_ms == 0 {
            return Err(ConfigError::Invalid("notify_cooldown_ms must be non-zero"));
        }
        if self.preferred_mtu < DEFAULT_MTU {
            return Err(ConfigError::Invalid("preferred_mtu must be at least 23"));
        }
        if self.device_name.is_empty() {
            return Err(ConfigError::Invalid("device_name must not be empty"));
        }
        Ok(())
    }

    /// Time to collect one full window
    ///
    /// Saturates for intervals that [`validate`](Self::validate) rejects.
    pub fn window_period(&self) -> Duration {
        Duration::from_millis(self.window_millis().unwrap_or(u64::MAX))
    }

    fn window_millis(&self) -> Option<u64> {
        self.sample_interval_ms
            .checked_mul(shared::SAMPLE_WINDOW as u64)
    }

    /// Pause after every delivery attempt
    pub fn notify_cooldown(&self) -> Duration {
        Duration::from_millis(self.notify_cooldown_ms)
    }

    /// Delay between the PHY and data length requests
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_interval_ms, 10);
        assert_eq!(config.notify_cooldown_ms, 5000);
        assert_eq!(config.settle_delay_ms, 1000);
        assert_eq!(config.window_period(), Duration::from_millis(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(r#"{"notify_cooldown_ms": 250}"#).unwrap();
        assert_eq!(config.notify_cooldown(), Duration::from_millis(250));
        assert_eq!(config.settle_delay(), Duration::from_millis(1000));
        assert_eq!(config.device_name, "SensorLink");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            PipelineConfig::from_json(r#"{"sample_interval_ms": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json(r#"{"preferred_mtu": 22}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_oversized_interval_rejected() {
        let json = r#"{"sample_interval_ms": 1000000000000000000}"#;
        assert!(matches!(
            PipelineConfig::from_json(json),
            Err(ConfigError::Invalid(_))
        ));

        let config = PipelineConfig {
            sample_interval_ms: u64::MAX,
            ..PipelineConfig::default()
        };
        assert_eq!(config.window_period(), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::load("/nonexistent/sensor-link.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
