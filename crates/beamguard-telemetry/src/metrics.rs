use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counters for cross-thread pipeline monitoring. Everything is a
/// relaxed atomic so reads never contend with the audio path.
#[derive(Clone, Default)]
pub struct PipelineMetrics {
    pub frames_captured: Arc<AtomicU64>,
    pub frames_analyzed: Arc<AtomicU64>,

    /// Frames dropped because the pipeline fell behind the capture
    /// callback. A rising value is a pipeline-health signal.
    pub capture_overruns: Arc<AtomicU64>,
    pub capture_timeouts: Arc<AtomicU64>,

    pub analysis_faults: Arc<AtomicU64>,
    pub alarm_frames: Arc<AtomicU64>,

    pub trips: Arc<AtomicU64>,
    pub watchdog_faults: Arc<AtomicU64>,
    pub actuation_retries: Arc<AtomicU64>,
    pub actuation_failures: Arc<AtomicU64>,
    pub reinitializations: Arc<AtomicU64>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &Arc<AtomicU64>) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &Arc<AtomicU64>) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
