use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::config::TriggerConfig;
use crate::types::{FeatureFault, FeatureVector};

const FULL_SCALE: f32 = 32_768.0;

/// Converts one audio frame into a spectral feature vector.
///
/// Hann-windowed forward FFT; the power spectrum is `|2/N * X_k|^2` over
/// the positive-frequency half. Amplitudes are normalized to the capture
/// device's full-scale range so thresholds stay portable across hardware
/// gain settings. Frames of the wrong length are rejected with a Fault
/// feature, never zero-padded.
pub struct SpectralAnalyzer {
    frame_size: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    band_bins: std::ops::RangeInclusive<usize>,
}

impl SpectralAnalyzer {
    pub fn new(config: &TriggerConfig) -> Self {
        let n = config.frame_size_samples;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);

        let window: Vec<f32> = (0..n)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (n.max(2) - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();

        // Bin k covers frequency k * fs / N; the band is clamped to the
        // positive-frequency half, DC excluded.
        let hz_per_bin = config.sample_rate_hz as f32 / n as f32;
        let low_bin = ((config.band_low_hz / hz_per_bin).ceil() as usize).max(1);
        let high_bin = ((config.band_high_hz / hz_per_bin).floor() as usize).min(n / 2 - 1);

        Self {
            frame_size: n,
            window,
            fft,
            band_bins: low_bin..=high_bin,
        }
    }

    pub fn analyze(&self, samples: &[i16]) -> FeatureVector {
        if samples.is_empty() {
            return FeatureVector::Fault(FeatureFault::EmptyFrame);
        }
        if samples.len() != self.frame_size {
            return FeatureVector::Fault(FeatureFault::WrongLength {
                expected: self.frame_size,
                got: samples.len(),
            });
        }

        let mut peak_amplitude = 0.0f32;
        let mut buffer: Vec<Complex<f32>> = Vec::with_capacity(self.frame_size);
        for (&sample, &w) in samples.iter().zip(self.window.iter()) {
            let normalized = sample as f32 / FULL_SCALE;
            peak_amplitude = peak_amplitude.max(normalized.abs());
            buffer.push(Complex {
                re: normalized * w,
                im: 0.0,
            });
        }

        self.fft.process(&mut buffer);

        let scale = 2.0 / self.frame_size as f32;
        let mut total_energy = 0.0f32;
        let mut band_energy = 0.0f32;
        for (bin, value) in buffer.iter().take(self.frame_size / 2).enumerate() {
            let power = (*value * scale).norm_sqr();
            total_energy += power;
            if self.band_bins.contains(&bin) {
                band_energy += power;
            }
        }

        if !total_energy.is_finite() || !band_energy.is_finite() || !peak_amplitude.is_finite() {
            return FeatureVector::Fault(FeatureFault::NonFinite);
        }

        FeatureVector::Measured {
            total_energy,
            band_energy,
            peak_amplitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_frame(config: &TriggerConfig, freq_hz: f32, amplitude: f32) -> Vec<i16> {
        (0..config.frame_size_samples)
            .map(|i| {
                let phase =
                    2.0 * std::f32::consts::PI * freq_hz * i as f32 / config.sample_rate_hz as f32;
                (phase.sin() * amplitude * FULL_SCALE) as i16
            })
            .collect()
    }

    #[test]
    fn empty_frame_is_fault() {
        let analyzer = SpectralAnalyzer::new(&TriggerConfig::default());
        assert_eq!(
            analyzer.analyze(&[]),
            FeatureVector::Fault(FeatureFault::EmptyFrame)
        );
    }

    #[test]
    fn truncated_frame_is_fault() {
        let config = TriggerConfig::default();
        let analyzer = SpectralAnalyzer::new(&config);
        let short = vec![0i16; config.frame_size_samples - 1];
        assert_eq!(
            analyzer.analyze(&short),
            FeatureVector::Fault(FeatureFault::WrongLength {
                expected: config.frame_size_samples,
                got: config.frame_size_samples - 1,
            })
        );
    }

    #[test]
    fn silence_has_zero_energy() {
        let config = TriggerConfig::default();
        let analyzer = SpectralAnalyzer::new(&config);
        let silence = vec![0i16; config.frame_size_samples];
        match analyzer.analyze(&silence) {
            FeatureVector::Measured {
                total_energy,
                band_energy,
                peak_amplitude,
            } => {
                assert_eq!(total_energy, 0.0);
                assert_eq!(band_energy, 0.0);
                assert_eq!(peak_amplitude, 0.0);
            }
            other => panic!("expected measured features, got {:?}", other),
        }
    }

    #[test]
    fn in_band_tone_concentrates_energy() {
        let config = TriggerConfig::default();
        let analyzer = SpectralAnalyzer::new(&config);
        let frame = sine_frame(&config, 1_000.0, 0.5);
        match analyzer.analyze(&frame) {
            FeatureVector::Measured {
                total_energy,
                band_energy,
                peak_amplitude,
            } => {
                assert!(band_energy > 0.0);
                assert!(
                    band_energy > 0.9 * total_energy,
                    "band {} vs total {}",
                    band_energy,
                    total_energy
                );
                assert!((peak_amplitude - 0.5).abs() < 0.01);
            }
            other => panic!("expected measured features, got {:?}", other),
        }
    }

    #[test]
    fn out_of_band_tone_stays_out_of_band() {
        let config = TriggerConfig::default();
        let analyzer = SpectralAnalyzer::new(&config);
        let frame = sine_frame(&config, 200.0, 0.5);
        match analyzer.analyze(&frame) {
            FeatureVector::Measured {
                total_energy,
                band_energy,
                ..
            } => {
                assert!(total_energy > 0.0);
                assert!(
                    band_energy < 0.01 * total_energy,
                    "band {} vs total {}",
                    band_energy,
                    total_energy
                );
            }
            other => panic!("expected measured features, got {:?}", other),
        }
    }

    #[test]
    fn full_scale_peak_is_unity() {
        let config = TriggerConfig::default();
        let analyzer = SpectralAnalyzer::new(&config);
        let mut frame = vec![0i16; config.frame_size_samples];
        frame[config.frame_size_samples / 2] = i16::MIN;
        match analyzer.analyze(&frame) {
            FeatureVector::Measured { peak_amplitude, .. } => {
                assert!((peak_amplitude - 1.0).abs() < 1e-6);
            }
            other => panic!("expected measured features, got {:?}", other),
        }
    }
}
