use std::time::{Duration, Instant};

/// One fixed-size block of mono samples. Immutable once captured; owned
/// by the analysis pipeline for a single processing pass.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate_hz: u32,
    pub timestamp: Instant,
    pub seq: u64,
}

impl AudioFrame {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate_hz as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_follows_sample_count() {
        let frame = AudioFrame {
            samples: vec![0; 4_410],
            sample_rate_hz: 44_100,
            timestamp: Instant::now(),
            seq: 0,
        };
        assert_eq!(frame.duration(), Duration::from_millis(100));
    }
}
