use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Liveness beacon owned by a monitored component. Beat it from the
/// component's main loop.
#[derive(Clone)]
pub struct Pulse {
    last_beat: Arc<RwLock<Instant>>,
}

impl Pulse {
    fn new() -> Self {
        Self {
            last_beat: Arc::new(RwLock::new(Instant::now())),
        }
    }

    pub fn beat(&self) {
        *self.last_beat.write() = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.last_beat.read().elapsed()
    }
}

/// Periodic heartbeat logger. Components register a `Pulse` before
/// `start`; a pulse that goes stale for more than three intervals is
/// reported at warn level. Detection of stalls in the safety path itself
/// is the watchdog's job, not this monitor's; this exists so an operator
/// reading the log can tell a healthy-but-quiet process from a dead one.
pub struct HealthMonitor {
    interval: Duration,
    components: Vec<(String, Pulse)>,
}

impl HealthMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            components: Vec::new(),
        }
    }

    pub fn register(&mut self, name: &str) -> Pulse {
        let pulse = Pulse::new();
        self.components.push((name.to_string(), pulse.clone()));
        pulse
    }

    pub fn start(self, running: Arc<AtomicBool>) -> JoinHandle<()> {
        let HealthMonitor {
            interval,
            components,
        } = self;
        thread::spawn(move || {
            // Short ticks so shutdown joins promptly even with long intervals.
            let tick = interval.min(Duration::from_millis(100));
            let mut since_check = Duration::ZERO;
            while running.load(Ordering::Relaxed) {
                thread::sleep(tick);
                since_check += tick;
                if since_check < interval {
                    continue;
                }
                since_check = Duration::ZERO;
                for (name, pulse) in &components {
                    let elapsed = pulse.elapsed();
                    if elapsed > interval * 3 {
                        tracing::warn!("Component '{}' stalled for {:?}", name, elapsed);
                    }
                }
                tracing::debug!("Heartbeat: {} components monitored", components.len());
            }
        })
    }
}
