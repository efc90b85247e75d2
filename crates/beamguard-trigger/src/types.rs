use serde::{Deserialize, Serialize};

/// Why a frame failed to convert into a usable feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureFault {
    /// Zero-length capture.
    EmptyFrame,
    /// Truncated or oversized capture; short frames are rejected, not
    /// zero-padded, so band-energy scale stays constant across the stream.
    WrongLength { expected: usize, got: usize },
    /// The transform produced NaN or infinity.
    NonFinite,
}

/// Per-frame spectral summary. A frame that fails to convert yields the
/// `Fault` variant rather than being silently dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureVector {
    Measured {
        /// Total spectral energy over the positive-frequency half.
        total_energy: f32,
        /// Energy restricted to the configured alarm band.
        band_energy: f32,
        /// Peak time-domain amplitude, normalized to full scale [0, 1].
        peak_amplitude: f32,
    },
    Fault(FeatureFault),
}

impl FeatureVector {
    pub fn fault(&self) -> Option<FeatureFault> {
        match *self {
            FeatureVector::Fault(f) => Some(f),
            FeatureVector::Measured { .. } => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, FeatureVector::Fault(_))
    }
}

/// Per-frame classification. Stateless across frames; downstream decision
/// logic consumes only the boolean so the safety path is free of
/// floating-point threshold drift. Confidence is diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_alarm_like: bool,
    /// Normalized distance above threshold, clamped to [0, 1].
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn quiet() -> Self {
        Self {
            is_alarm_like: false,
            confidence: 0.0,
        }
    }
}
