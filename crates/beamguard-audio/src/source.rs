use beamguard_foundation::CaptureError;
use std::time::Duration;

use crate::frame::AudioFrame;

/// Blocking pull boundary over the capture device.
///
/// A `Timeout` is a first-class signal feeding the watchdog, not an
/// exception to be swallowed; `SourceClosed` means the producer is gone
/// and the stream will never resume.
pub trait AudioSource: Send {
    fn next_frame(&mut self, timeout: Duration) -> Result<AudioFrame, CaptureError>;

    fn sample_rate_hz(&self) -> u32;

    /// Frames dropped at the producer since the last call. Non-zero
    /// values are a pipeline-health signal, not silent data loss.
    fn take_overruns(&mut self) -> u64 {
        0
    }
}
