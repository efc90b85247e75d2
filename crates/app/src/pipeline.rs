use beamguard_audio::{AudioSource, WatchdogTimer};
use beamguard_foundation::{CaptureError, Pulse, ShutdownToken};
use beamguard_telemetry::PipelineMetrics;
use beamguard_trigger::{SpectralAnalyzer, TriggerClassifier};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::interlock::SharedController;

/// The per-frame analysis loop, on its own thread so telemetry and
/// status work can never block audio. Pull, analyze, classify, decide,
/// then feed the watchdog. A pull timeout is handled as a first-class
/// signal; the watchdog thread owns the resulting Fault decision.
pub struct PipelineThread {
    source: Box<dyn AudioSource>,
    analyzer: SpectralAnalyzer,
    classifier: TriggerClassifier,
    controller: SharedController,
    watchdog: WatchdogTimer,
    pulse: Pulse,
    metrics: PipelineMetrics,
    shutdown: ShutdownToken,
    poll_timeout: Duration,
}

impl PipelineThread {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn AudioSource>,
        analyzer: SpectralAnalyzer,
        classifier: TriggerClassifier,
        controller: SharedController,
        watchdog: WatchdogTimer,
        pulse: Pulse,
        metrics: PipelineMetrics,
        shutdown: ShutdownToken,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            source,
            analyzer,
            classifier,
            controller,
            watchdog,
            pulse,
            metrics,
            shutdown,
            poll_timeout,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    fn run(mut self) {
        tracing::info!("Pipeline thread started");
        let mut frames: u64 = 0;

        while !self.shutdown.is_shutdown() {
            match self.source.next_frame(self.poll_timeout) {
                Ok(frame) => {
                    self.watchdog.feed();
                    self.pulse.beat();

                    let overruns = self.source.take_overruns();
                    if overruns > 0 {
                        tracing::warn!("Capture overrun: {} frames dropped", overruns);
                    }

                    let features = self.analyzer.analyze(&frame.samples);
                    let result = self.classifier.classify(&features);
                    self.controller.lock().handle_features(&features, result);

                    PipelineMetrics::incr(&self.metrics.frames_analyzed);
                    frames += 1;
                    if frames % 600 == 0 {
                        tracing::debug!("Pipeline: {} frames analyzed", frames);
                    }
                }
                Err(CaptureError::Timeout { timeout }) => {
                    PipelineMetrics::incr(&self.metrics.capture_timeouts);
                    tracing::trace!("No frame within {:?}", timeout);
                }
                Err(CaptureError::SourceClosed) => {
                    self.controller.lock().handle_source_closed();
                    break;
                }
                Err(e) => {
                    tracing::warn!("Capture error: {}", e);
                }
            }
        }

        tracing::info!("Pipeline thread exiting after {} frames", frames);
    }
}
