//! Simulation sources: a scripted source for tests and a free-running
//! sine source for `--simulate` operation with no microphone attached.

use beamguard_foundation::CaptureError;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::frame::AudioFrame;
use crate::source::AudioSource;

const FULL_SCALE: f32 = 32_768.0;

/// Deterministic source fed from a prepared frame script. Once the
/// script is exhausted every pull times out, which exercises the same
/// watchdog path a stalled microphone does.
pub struct ScriptedSource {
    frames: VecDeque<Vec<i16>>,
    sample_rate_hz: u32,
    seq: u64,
}

impl ScriptedSource {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            frames: VecDeque::new(),
            sample_rate_hz,
            seq: 0,
        }
    }

    pub fn push_frame(&mut self, samples: Vec<i16>) {
        self.frames.push_back(samples);
    }

    pub fn push_silence(&mut self, count: usize, frame_size: usize) {
        for _ in 0..count {
            self.frames.push_back(vec![0i16; frame_size]);
        }
    }

    pub fn push_tone(
        &mut self,
        count: usize,
        frame_size: usize,
        freq_hz: f32,
        amplitude: f32,
    ) {
        for _ in 0..count {
            let start = self.frames.len() * frame_size;
            let frame = (0..frame_size)
                .map(|i| {
                    let t = (start + i) as f32 / self.sample_rate_hz as f32;
                    let phase = 2.0 * std::f32::consts::PI * freq_hz * t;
                    (phase.sin() * amplitude * (FULL_SCALE - 1.0)) as i16
                })
                .collect();
            self.frames.push_back(frame);
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl AudioSource for ScriptedSource {
    fn next_frame(&mut self, timeout: Duration) -> Result<AudioFrame, CaptureError> {
        match self.frames.pop_front() {
            Some(samples) => {
                let frame = AudioFrame {
                    samples,
                    sample_rate_hz: self.sample_rate_hz,
                    timestamp: Instant::now(),
                    seq: self.seq,
                };
                self.seq += 1;
                Ok(frame)
            }
            None => {
                // Block like a real pull would before reporting starvation.
                std::thread::sleep(timeout);
                Err(CaptureError::Timeout { timeout })
            }
        }
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }
}

/// Free-running tone generator paced at real time, one frame per frame
/// period. Amplitude 0.0 simulates a quiet room.
pub struct SineSource {
    freq_hz: f32,
    amplitude: f32,
    frame_size: usize,
    sample_rate_hz: u32,
    samples_emitted: u64,
    seq: u64,
}

impl SineSource {
    pub fn new(freq_hz: f32, amplitude: f32, frame_size: usize, sample_rate_hz: u32) -> Self {
        Self {
            freq_hz,
            amplitude: amplitude.clamp(0.0, 1.0),
            frame_size,
            sample_rate_hz,
            samples_emitted: 0,
            seq: 0,
        }
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(self.frame_size as f64 / self.sample_rate_hz as f64)
    }
}

impl AudioSource for SineSource {
    fn next_frame(&mut self, _timeout: Duration) -> Result<AudioFrame, CaptureError> {
        std::thread::sleep(self.frame_period());
        let samples = (0..self.frame_size)
            .map(|i| {
                let t = (self.samples_emitted + i as u64) as f32 / self.sample_rate_hz as f32;
                let phase = 2.0 * std::f32::consts::PI * self.freq_hz * t;
                (phase.sin() * self.amplitude * (FULL_SCALE - 1.0)) as i16
            })
            .collect();
        self.samples_emitted += self.frame_size as u64;
        let frame = AudioFrame {
            samples,
            sample_rate_hz: self.sample_rate_hz,
            timestamp: Instant::now(),
            seq: self.seq,
        };
        self.seq += 1;
        Ok(frame)
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }
}
