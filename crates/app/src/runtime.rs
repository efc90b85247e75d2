use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use beamguard_audio::{
    AudioSource, CaptureConfig, CaptureThread, SineSource, WatchdogTimer,
};
use beamguard_foundation::{
    ActuatorError, AppError, HealthMonitor, InterlockState, ShutdownHandler,
};
use beamguard_relay::{GpioLine, MockLine, RelayActuator, RelayLine};
use beamguard_telemetry::{PipelineMetrics, StatusBoard};
use beamguard_trigger::{SpectralAnalyzer, TriggerClassifier};

use crate::config::AppConfig;
use crate::interlock::{InterlockController, SharedController};
use crate::pipeline::PipelineThread;

/// Where audio frames come from.
#[derive(Debug, Clone)]
pub enum SourceMode {
    /// Capture from the configured input device.
    Live,
    /// Free-running generated tone; amplitude 0.0 is a quiet room.
    Simulate { freq_hz: f32, amplitude: f32 },
    /// No capture pipeline at all; the interlock is held in Fault and
    /// the relay stays disabled.
    Disabled,
}

#[derive(Debug, Clone)]
pub enum RelayBackend {
    Gpio,
    Mock,
}

pub struct RuntimeOptions {
    pub config: AppConfig,
    pub source: SourceMode,
    pub relay: RelayBackend,
}

/// Handle to the running monitor: join handles for every thread plus the
/// shared read surfaces.
pub struct AppHandle {
    pub status: StatusBoard,
    pub metrics: PipelineMetrics,
    controller: SharedController,
    pipeline: Option<JoinHandle<()>>,
    status_logger: Option<JoinHandle<()>>,
    health: Option<JoinHandle<()>>,
    watchdog: Option<WatchdogTimer>,
    capture: Option<CaptureThread>,
    running: Arc<AtomicBool>,
    shutdown: Arc<ShutdownHandler>,
}

/// Cheap handle for the external re-initialization control (SIGHUP).
#[derive(Clone)]
pub struct ReinitHandle(SharedController);

impl ReinitHandle {
    pub fn reinitialize(&self) {
        self.0.lock().reinitialize();
    }
}

impl AppHandle {
    pub fn state(&self) -> InterlockState {
        self.status.state()
    }

    /// The sanctioned path out of a latched Fault (SIGHUP in production).
    pub fn reinitialize(&self) {
        self.controller.lock().reinitialize();
    }

    pub fn reinit_handle(&self) -> ReinitHandle {
        ReinitHandle(Arc::clone(&self.controller))
    }

    /// Stop every thread, then command the relay to the disabled
    /// position as the last act before returning.
    pub fn shutdown(mut self) {
        tracing::info!("Shutting down Beamguard runtime...");
        self.shutdown.request();

        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.join();
        }
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }

        self.running.store(false, Ordering::SeqCst);
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.stop();
        }
        if let Some(health) = self.health.take() {
            let _ = health.join();
        }
        if let Some(logger) = self.status_logger.take() {
            let _ = logger.join();
        }

        self.controller.lock().shutdown();
        tracing::info!("Beamguard runtime shutdown complete");
    }
}

/// Wire and start the full monitor per the options.
pub fn start(options: RuntimeOptions, shutdown: Arc<ShutdownHandler>) -> Result<AppHandle, AppError> {
    let RuntimeOptions {
        config,
        source,
        relay,
    } = options;
    config.validate()?;

    let metrics = PipelineMetrics::new();

    let line: Box<dyn RelayLine> = match relay {
        RelayBackend::Gpio => Box::new(
            GpioLine::open(&config.relay.gpio_value_path).map_err(|e| {
                // A missing relay line means fail-safe actuation cannot be
                // guaranteed at all; refuse to start, like a config error.
                AppError::Actuator(ActuatorError::LineUnavailable(format!(
                    "{}: {}",
                    config.relay.gpio_value_path, e
                )))
            })?,
        ),
        RelayBackend::Mock => {
            tracing::info!("Using mock relay line (simulation)");
            Box::new(MockLine::new())
        }
    };

    let mut capture = None;
    let frame_source: Option<Box<dyn AudioSource>> = match source {
        SourceMode::Live => {
            let (thread, captured) = CaptureThread::spawn(
                CaptureConfig {
                    device: config.audio.device.clone(),
                    sample_rate_hz: config.trigger.sample_rate_hz,
                    frame_size_samples: config.trigger.frame_size_samples,
                    channel_capacity: config.audio.channel_capacity,
                },
                metrics.clone(),
            );
            capture = Some(thread);
            Some(Box::new(captured))
        }
        SourceMode::Simulate { freq_hz, amplitude } => {
            tracing::info!(
                "Using simulated audio source: {} Hz at amplitude {}",
                freq_hz,
                amplitude
            );
            Some(Box::new(SineSource::new(
                freq_hz,
                amplitude,
                config.trigger.frame_size_samples,
                config.trigger.sample_rate_hz,
            )))
        }
        SourceMode::Disabled => {
            tracing::warn!("Audio disabled; interlock held in Fault, relay disabled");
            None
        }
    };

    let handle = start_custom(config, frame_source, line, shutdown, metrics)?;
    // The capture thread outlives this scope through the handle.
    Ok(AppHandle { capture, ..handle })
}

/// Lower-level wiring entry used by `start` and by integration tests
/// that inject scripted sources and mock relay lines.
pub fn start_custom(
    config: AppConfig,
    frame_source: Option<Box<dyn AudioSource>>,
    line: Box<dyn RelayLine>,
    shutdown: Arc<ShutdownHandler>,
    metrics: PipelineMetrics,
) -> Result<AppHandle, AppError> {
    config.validate()?;

    let status = StatusBoard::new(config.status.diagnostics_depth);
    let running = Arc::new(AtomicBool::new(true));

    let actuator = RelayActuator::new(
        line,
        config.relay.polarity,
        config.relay.retry_attempts,
        config.relay.retry_backoff(),
    );
    let controller = InterlockController::new(
        &config.trigger,
        actuator,
        status.clone(),
        metrics.clone(),
    )
    .into_shared();

    let mut health_monitor = HealthMonitor::new(Duration::from_secs(10));

    let (pipeline, watchdog) = match frame_source {
        Some(source) => {
            let watchdog = WatchdogTimer::new(config.trigger.watchdog_interval());
            let watchdog_controller = Arc::clone(&controller);
            watchdog.start(Arc::clone(&running), move || {
                watchdog_controller.lock().handle_watchdog_expired();
            });

            let poll_timeout = (config.trigger.frame_duration() * 2)
                .max(Duration::from_millis(50));
            let pipeline = PipelineThread::new(
                source,
                SpectralAnalyzer::new(&config.trigger),
                TriggerClassifier::new(&config.trigger),
                Arc::clone(&controller),
                watchdog.clone(),
                health_monitor.register("pipeline"),
                metrics.clone(),
                shutdown.token(),
                poll_timeout,
            )
            .spawn();
            (Some(pipeline), Some(watchdog))
        }
        None => (None, None),
    };

    let health = health_monitor.start(Arc::clone(&running));
    let status_logger = spawn_status_logger(
        status.clone(),
        metrics.clone(),
        Duration::from_secs(config.status.log_period_secs.max(1)),
        Arc::clone(&running),
    );

    Ok(AppHandle {
        status,
        metrics,
        controller,
        pipeline,
        status_logger: Some(status_logger),
        health: Some(health),
        watchdog,
        capture: None,
        running,
        shutdown,
    })
}

fn spawn_status_logger(
    status: StatusBoard,
    metrics: PipelineMetrics,
    period: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut since_log = Duration::ZERO;
        let tick = Duration::from_millis(250);
        while running.load(Ordering::Relaxed) {
            std::thread::sleep(tick);
            since_log += tick;
            if since_log < period {
                continue;
            }
            since_log = Duration::ZERO;
            let snap = status.snapshot();
            tracing::info!(
                "Interlock status: state={:?} reason={:?} faults={} frames={} trips={}",
                snap.state,
                snap.last_transition_reason,
                snap.consecutive_faults,
                PipelineMetrics::get(&metrics.frames_analyzed),
                PipelineMetrics::get(&metrics.trips),
            );
        }
    })
}
