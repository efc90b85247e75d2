use crate::config::TriggerConfig;
use crate::types::{ClassificationResult, FeatureVector};

/// Evaluates a feature vector against the configured thresholds.
///
/// A frame is alarm-like only when band energy AND peak amplitude both
/// exceed their thresholds: broadband bursts that are loud but not
/// spectrally matched fail the energy test, narrowband hum that is
/// spectrally matched but quiet fails the amplitude test.
pub struct TriggerClassifier {
    energy_threshold: f32,
    amplitude_threshold: f32,
}

impl TriggerClassifier {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            energy_threshold: config.energy_threshold,
            amplitude_threshold: config.amplitude_threshold,
        }
    }

    pub fn classify(&self, features: &FeatureVector) -> ClassificationResult {
        match *features {
            // A fault is a pipeline-health signal, not evidence of quiet;
            // the caller surfaces it to the state machine separately.
            FeatureVector::Fault(_) => ClassificationResult::quiet(),
            FeatureVector::Measured {
                band_energy,
                peak_amplitude,
                ..
            } => {
                let energy_margin = margin(band_energy, self.energy_threshold);
                let amplitude_margin = margin(peak_amplitude, self.amplitude_threshold);
                ClassificationResult {
                    is_alarm_like: band_energy > self.energy_threshold
                        && peak_amplitude > self.amplitude_threshold,
                    confidence: energy_margin.min(amplitude_margin),
                }
            }
        }
    }
}

/// Distance above threshold, normalized by the threshold and clamped to
/// [0, 1]. Zero at or below threshold.
fn margin(value: f32, threshold: f32) -> f32 {
    if threshold <= 0.0 {
        return if value > 0.0 { 1.0 } else { 0.0 };
    }
    ((value - threshold) / threshold).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureFault;

    fn classifier() -> TriggerClassifier {
        TriggerClassifier::new(&TriggerConfig {
            energy_threshold: 1.0,
            amplitude_threshold: 0.5,
            ..Default::default()
        })
    }

    fn measured(band_energy: f32, peak_amplitude: f32) -> FeatureVector {
        FeatureVector::Measured {
            total_energy: band_energy,
            band_energy,
            peak_amplitude,
        }
    }

    #[test]
    fn both_thresholds_exceeded_is_alarm_like() {
        let result = classifier().classify(&measured(2.0, 0.8));
        assert!(result.is_alarm_like);
        assert!(result.confidence > 0.0);
    }

    #[test]
    fn energy_alone_is_not_alarm_like() {
        let result = classifier().classify(&measured(10.0, 0.1));
        assert!(!result.is_alarm_like);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn amplitude_alone_is_not_alarm_like() {
        let result = classifier().classify(&measured(0.1, 0.9));
        assert!(!result.is_alarm_like);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn fault_feature_classifies_quiet_with_zero_confidence() {
        let result = classifier().classify(&FeatureVector::Fault(FeatureFault::EmptyFrame));
        assert!(!result.is_alarm_like);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn confidence_is_clamped_to_unity() {
        let result = classifier().classify(&measured(1_000.0, 500.0));
        assert!(result.is_alarm_like);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn confidence_is_the_weaker_margin() {
        // Energy margin 1.0 (clamped), amplitude margin (0.6-0.5)/0.5 = 0.2.
        let result = classifier().classify(&measured(5.0, 0.6));
        assert!(result.is_alarm_like);
        assert!((result.confidence - 0.2).abs() < 1e-6);
    }
}
