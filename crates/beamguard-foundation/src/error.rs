use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Capture subsystem error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Relay actuation error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No audio frame within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("Capture overrun, dropped {count} frames")]
    Overrun { count: u64 },

    #[error("Capture source closed")]
    SourceClosed,

    #[error("CPAL error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Default stream config error: {0}")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Device enumeration error: {0}")]
    Devices(#[from] cpal::DevicesError),
}

#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("Relay write failed after {attempts} attempts: {source}")]
    WriteExhausted {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Relay line unavailable: {0}")]
    LineUnavailable(String),

    #[error("Relay read-back failed: {0}")]
    ReadBack(#[source] std::io::Error),
}

/// Configuration problems are the only errors allowed to abort startup.
/// Each variant names the invariant it rejects so the refusal is
/// actionable from the log alone.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("clear_frames ({clear}) must be strictly greater than trip_frames ({trip})")]
    HysteresisInverted { trip: u32, clear: u32 },

    #[error("trip_frames must be non-zero")]
    ZeroTripFrames,

    #[error("frame_size_samples must be non-zero")]
    ZeroFrameSize,

    #[error("sample_rate_hz must be non-zero")]
    ZeroSampleRate,

    #[error("{name} must be finite and non-negative, got {value}")]
    BadThreshold { name: &'static str, value: f32 },

    #[error("alarm band {low_hz}..{high_hz} Hz is invalid at sample rate {sample_rate_hz} Hz")]
    BadBand {
        low_hz: f32,
        high_hz: f32,
        sample_rate_hz: u32,
    },

    #[error("warmup_frames must be non-zero")]
    ZeroWarmupFrames,

    #[error("watchdog_interval_ms must be non-zero")]
    ZeroWatchdogInterval,

    #[error("relay retry_attempts must be non-zero")]
    ZeroRetryAttempts,

    #[error("Failed to read config file {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("Failed to parse config file {path}: {message}")]
    Unparseable { path: String, message: String },
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    ForceFault,
    Ignore,
    Fatal,
}

impl AppError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            AppError::Capture(CaptureError::Overrun { .. }) => RecoveryStrategy::Ignore,
            AppError::Capture(CaptureError::DeviceDisconnected) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            AppError::Capture(_) | AppError::Actuator(_) => RecoveryStrategy::ForceFault,
            AppError::Config(_) | AppError::Fatal(_) | AppError::ShutdownRequested => {
                RecoveryStrategy::Fatal
            }
        }
    }
}
