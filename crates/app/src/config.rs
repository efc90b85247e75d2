use beamguard_foundation::ConfigError;
use beamguard_relay::RelayPolarity;
use beamguard_trigger::TriggerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration, loaded from TOML and validated before any
/// thread starts. An inconsistent safety configuration refuses to run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub trigger: TriggerConfig,
    pub relay: RelaySettings,
    pub audio: AudioSettings,
    pub status: StatusSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Sysfs value file of the interlock relay line. The pin matches the
    /// installation's wiring; pin 7 is the historical default.
    pub gpio_value_path: String,
    pub polarity: RelayPolarity,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            gpio_value_path: "/sys/class/gpio/gpio7/value".to_string(),
            polarity: RelayPolarity::ActiveHigh,
            retry_attempts: 3,
            retry_backoff_ms: 50,
        }
    }
}

impl RelaySettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Input device name; None picks the host default.
    pub device: Option<String>,
    /// Bounded capture-to-pipeline handoff depth.
    pub channel_capacity: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            device: None,
            channel_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSettings {
    /// Period of the status log line, seconds.
    pub log_period_secs: u64,
    /// Depth of the rolling classification diagnostics ring.
    pub diagnostics_depth: usize,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            log_period_secs: 10,
            diagnostics_depth: 32,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: AppConfig = toml::from_str(&raw).map_err(|e| ConfigError::Unparseable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trigger.validate()?;
        if self.relay.retry_attempts == 0 {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn load_round_trips_through_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[trigger]
trip_frames = 5
clear_frames = 20
band_low_hz = 900.0
band_high_hz = 1100.0

[relay]
polarity = "active_low"
retry_attempts = 2

[audio]
device = "hw:1,0"
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.trigger.trip_frames, 5);
        assert_eq!(config.trigger.clear_frames, 20);
        assert_eq!(config.relay.polarity, RelayPolarity::ActiveLow);
        assert_eq!(config.relay.retry_attempts, 2);
        assert_eq!(config.audio.device.as_deref(), Some("hw:1,0"));
        // Unspecified sections keep their defaults.
        assert_eq!(config.status.log_period_secs, 10);
    }

    #[test]
    fn load_rejects_inconsistent_hysteresis() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[trigger]
trip_frames = 10
clear_frames = 5
"#
        )
        .unwrap();
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::HysteresisInverted { .. })
        ));
    }

    #[test]
    fn load_rejects_missing_file() {
        assert!(matches!(
            AppConfig::load(Path::new("/nonexistent/beamguard.toml")),
            Err(ConfigError::Unreadable { .. })
        ));
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not toml at all [[[").unwrap();
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::Unparseable { .. })
        ));
    }
}
