use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use beamguard_foundation::CaptureError;
use beamguard_telemetry::PipelineMetrics;

use crate::frame::AudioFrame;
use crate::source::AudioSource;

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Input device name; None picks the host default.
    pub device: Option<String>,
    pub sample_rate_hz: u32,
    pub frame_size_samples: usize,
    /// Bounded handoff depth between the capture callback and the
    /// pipeline. When full, new frames are dropped and counted.
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate_hz: 44_100,
            frame_size_samples: 4_410,
            channel_capacity: 32,
        }
    }
}

/// Handle to the dedicated capture thread.
pub struct CaptureThread {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl CaptureThread {
    /// Spawn the capture thread and return the pull side of the stream.
    ///
    /// Device and stream setup happen on the capture thread itself; a
    /// setup failure is logged, the thread exits, and the consumer sees
    /// `SourceClosed` on the next pull: the fail-safe path rather than a
    /// startup abort, since the interlock must hold Fault either way.
    pub fn spawn(config: CaptureConfig, metrics: PipelineMetrics) -> (Self, CapturedSource) {
        let running = Arc::new(AtomicBool::new(true));
        let overruns = Arc::new(AtomicU64::new(0));
        let (tx, rx) = crossbeam_channel::bounded(config.channel_capacity.max(1));

        let source = CapturedSource {
            rx,
            sample_rate_hz: config.sample_rate_hz,
            overruns: Arc::clone(&overruns),
            seen_overruns: 0,
        };

        let thread_running = Arc::clone(&running);
        let handle = thread::spawn(move || {
            if let Err(e) = run_capture(config, tx, overruns, metrics, thread_running) {
                tracing::error!("Audio capture stopped: {}", e);
            }
        });

        (
            Self {
                handle: Some(handle),
                running,
            },
            source,
        )
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pull side of the capture handoff.
pub struct CapturedSource {
    rx: Receiver<AudioFrame>,
    sample_rate_hz: u32,
    overruns: Arc<AtomicU64>,
    seen_overruns: u64,
}

impl AudioSource for CapturedSource {
    fn next_frame(&mut self, timeout: Duration) -> Result<AudioFrame, CaptureError> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(frame),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                Err(CaptureError::Timeout { timeout })
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(CaptureError::SourceClosed)
            }
        }
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    fn take_overruns(&mut self) -> u64 {
        let total = self.overruns.load(Ordering::Relaxed);
        let delta = total - self.seen_overruns;
        self.seen_overruns = total;
        delta
    }
}

struct FrameAccumulator {
    buf: Vec<i16>,
    frame_size: usize,
    sample_rate_hz: u32,
    seq: u64,
    tx: Sender<AudioFrame>,
    overruns: Arc<AtomicU64>,
    metrics: PipelineMetrics,
}

impl FrameAccumulator {
    fn push_samples(&mut self, samples: impl Iterator<Item = i16>) {
        self.buf.extend(samples);
        while self.buf.len() >= self.frame_size {
            let rest = self.buf.split_off(self.frame_size);
            let samples = std::mem::replace(&mut self.buf, rest);
            let frame = AudioFrame {
                samples,
                sample_rate_hz: self.sample_rate_hz,
                timestamp: Instant::now(),
                seq: self.seq,
            };
            self.seq += 1;
            match self.tx.try_send(frame) {
                Ok(()) => {
                    PipelineMetrics::incr(&self.metrics.frames_captured);
                }
                Err(TrySendError::Full(_)) => {
                    // The callback must never block; drop and count.
                    self.overruns.fetch_add(1, Ordering::Relaxed);
                    PipelineMetrics::incr(&self.metrics.capture_overruns);
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }
}

fn run_capture(
    config: CaptureConfig,
    tx: Sender<AudioFrame>,
    overruns: Arc<AtomicU64>,
    metrics: PipelineMetrics,
    running: Arc<AtomicBool>,
) -> Result<(), CaptureError> {
    let host = cpal::default_host();
    let device = match &config.device {
        Some(name) => host
            .input_devices()?
            .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceNotFound {
                name: config.device.clone(),
            })?,
        None => host
            .default_input_device()
            .ok_or(CaptureError::DeviceNotFound { name: None })?,
    };
    tracing::info!(
        "Capturing from device: {}",
        device.name().unwrap_or_else(|_| "<unnamed>".to_string())
    );

    let supported = device.default_input_config()?;
    let channels = supported.channels() as usize;
    let stream_config = cpal::StreamConfig {
        channels: supported.channels(),
        sample_rate: cpal::SampleRate(config.sample_rate_hz),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut acc = FrameAccumulator {
        buf: Vec::with_capacity(config.frame_size_samples * 2),
        frame_size: config.frame_size_samples,
        sample_rate_hz: config.sample_rate_hz,
        seq: 0,
        tx,
        overruns,
        metrics,
    };

    let err_fn = |e: cpal::StreamError| tracing::error!("Capture stream error: {}", e);

    // Mono: channel 0 of interleaved input.
    let stream = match supported.sample_format() {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                acc.push_samples(data.iter().step_by(channels).copied());
            },
            err_fn,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                acc.push_samples(
                    data.iter()
                        .step_by(channels)
                        .map(|&s| (s * 32_767.0).clamp(-32_768.0, 32_767.0) as i16),
                );
            },
            err_fn,
            None,
        )?,
        other => {
            return Err(CaptureError::FormatNotSupported {
                format: format!("{:?}", other),
            })
        }
    };

    stream.play()?;
    while running.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(50));
    }
    Ok(())
}
