use beamguard_foundation::{real_clock, SharedClock};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Liveness watchdog for the frame stream.
///
/// Runs on its own thread so it fires even when the pipeline thread is
/// wedged; on expiry it invokes the registered hook exactly once per
/// starvation episode. The hook is where the interlock gets forced to
/// Fault and the relay to disabled. Clones share the same timer, so the
/// pipeline can feed while the runtime owns start/stop.
#[derive(Clone)]
pub struct WatchdogTimer {
    timeout: Duration,
    poll_interval: Duration,
    last_feed: Arc<RwLock<std::time::Instant>>,
    triggered: Arc<AtomicBool>,
    clock: SharedClock,
    handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl WatchdogTimer {
    pub fn new(timeout: Duration) -> Self {
        Self::new_with_clock(timeout, real_clock())
    }

    pub fn new_with_clock(timeout: Duration, clock: SharedClock) -> Self {
        Self {
            timeout,
            poll_interval: (timeout / 4)
                .clamp(Duration::from_millis(10), Duration::from_millis(100)),
            last_feed: Arc::new(RwLock::new(clock.now())),
            triggered: Arc::new(AtomicBool::new(false)),
            clock,
            handle: Arc::new(RwLock::new(None)),
        }
    }

    pub fn start<F>(&self, running: Arc<AtomicBool>, on_expire: F)
    where
        F: Fn() + Send + 'static,
    {
        let timeout = self.timeout;
        let poll_interval = self.poll_interval;
        let last_feed = Arc::clone(&self.last_feed);
        let triggered = Arc::clone(&self.triggered);
        let clock = Arc::clone(&self.clock);

        *last_feed.write() = clock.now();

        let handle = thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(poll_interval);

                let elapsed = clock.now().duration_since(*last_feed.read());
                if elapsed > timeout && !triggered.load(Ordering::SeqCst) {
                    tracing::error!("Watchdog timeout! No audio frame for {:?}", elapsed);
                    triggered.store(true, Ordering::SeqCst);
                    on_expire();
                }
            }
        });
        *self.handle.write() = Some(handle);
    }

    pub fn feed(&self) {
        *self.last_feed.write() = self.clock.now();
        self.triggered.store(false, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Join the watchdog thread. The caller clears its `running` flag
    /// first; the thread exits within one poll interval.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.write().take() {
            let _ = handle.join();
        }
        self.triggered.store(false, Ordering::SeqCst);
    }
}
