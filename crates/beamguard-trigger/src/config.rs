use beamguard_foundation::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the acoustic trigger path. Every field is validated
/// before the pipeline starts; the process refuses to run in an ambiguous
/// safety configuration.
///
/// The energy and amplitude thresholds are deployment-time calibration
/// values; the defaults here match a bench setup with the alarm sounder
/// roughly one meter from the microphone and are expected to be
/// overridden per installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub sample_rate_hz: u32,
    pub frame_size_samples: usize,
    /// Lower edge of the alarm frequency band, Hz.
    pub band_low_hz: f32,
    /// Upper edge of the alarm frequency band, Hz.
    pub band_high_hz: f32,
    /// Band energy above this value counts toward an alarm-like frame.
    pub energy_threshold: f32,
    /// Normalized peak amplitude above this value counts toward an
    /// alarm-like frame. Both thresholds must be exceeded together.
    pub amplitude_threshold: f32,
    /// Consecutive alarm-like frames required to trip (T_trip).
    pub trip_frames: u32,
    /// Consecutive quiet frames required to re-arm (T_clear). Must be
    /// strictly greater than trip_frames.
    pub clear_frames: u32,
    pub watchdog_interval_ms: u64,
    /// Consecutive healthy frames required before leaving the startup
    /// Fault state.
    pub warmup_frames: u32,
    /// Consecutive analysis faults tolerated before latching Fault.
    pub fault_tolerance: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44_100,
            frame_size_samples: 4_410,
            band_low_hz: 950.0,
            band_high_hz: 1_050.0,
            energy_threshold: 1.0e-3,
            amplitude_threshold: 0.1,
            trip_frames: 7,
            clear_frames: 30,
            watchdog_interval_ms: 2_000,
            warmup_frames: 50,
            fault_tolerance: 3,
        }
    }
}

impl TriggerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.frame_size_samples == 0 {
            return Err(ConfigError::ZeroFrameSize);
        }
        if self.trip_frames == 0 {
            return Err(ConfigError::ZeroTripFrames);
        }
        if self.clear_frames <= self.trip_frames {
            return Err(ConfigError::HysteresisInverted {
                trip: self.trip_frames,
                clear: self.clear_frames,
            });
        }
        for (name, value) in [
            ("energy_threshold", self.energy_threshold),
            ("amplitude_threshold", self.amplitude_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::BadThreshold { name, value });
            }
        }
        let nyquist = self.sample_rate_hz as f32 / 2.0;
        if !self.band_low_hz.is_finite()
            || !self.band_high_hz.is_finite()
            || self.band_low_hz < 0.0
            || self.band_low_hz >= self.band_high_hz
            || self.band_high_hz > nyquist
        {
            return Err(ConfigError::BadBand {
                low_hz: self.band_low_hz,
                high_hz: self.band_high_hz,
                sample_rate_hz: self.sample_rate_hz,
            });
        }
        // The band must cover at least one FFT bin, or no sound could
        // ever trip the interlock.
        let hz_per_bin = self.sample_rate_hz as f32 / self.frame_size_samples as f32;
        let low_bin = ((self.band_low_hz / hz_per_bin).ceil() as usize).max(1);
        let high_bin = ((self.band_high_hz / hz_per_bin).floor() as usize)
            .min((self.frame_size_samples / 2).saturating_sub(1));
        if low_bin > high_bin {
            return Err(ConfigError::BadBand {
                low_hz: self.band_low_hz,
                high_hz: self.band_high_hz,
                sample_rate_hz: self.sample_rate_hz,
            });
        }
        if self.warmup_frames == 0 {
            return Err(ConfigError::ZeroWarmupFrames);
        }
        if self.watchdog_interval_ms == 0 {
            return Err(ConfigError::ZeroWatchdogInterval);
        }
        Ok(())
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_size_samples as f64 / self.sample_rate_hz as f64)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TriggerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_clear_not_greater_than_trip() {
        let config = TriggerConfig {
            trip_frames: 10,
            clear_frames: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::HysteresisInverted { trip: 10, clear: 10 })
        ));
    }

    #[test]
    fn rejects_zero_frame_size() {
        let config = TriggerConfig {
            frame_size_samples: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroFrameSize)));
    }

    #[test]
    fn rejects_negative_threshold() {
        let config = TriggerConfig {
            energy_threshold: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadThreshold { .. })
        ));
    }

    #[test]
    fn rejects_band_beyond_nyquist() {
        let config = TriggerConfig {
            sample_rate_hz: 16_000,
            band_low_hz: 7_000.0,
            band_high_hz: 9_000.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BadBand { .. })));
    }

    #[test]
    fn rejects_band_narrower_than_fft_resolution() {
        // 16-sample frames at 44.1 kHz resolve 2756 Hz per bin; the
        // default 950..1050 Hz band covers no bin at all.
        let config = TriggerConfig {
            frame_size_samples: 16,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BadBand { .. })));
    }

    #[test]
    fn frame_duration_matches_rate() {
        let config = TriggerConfig::default();
        assert_eq!(config.frame_duration(), Duration::from_millis(100));
    }
}
