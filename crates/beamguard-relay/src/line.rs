use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A single named hardware output line. The actuator owns the only
/// writer; `read` exists for status read-back.
pub trait RelayLine: Send {
    fn write(&mut self, level: bool) -> io::Result<()>;

    fn read(&self) -> io::Result<bool>;
}

/// Sysfs GPIO line, e.g. `/sys/class/gpio/gpio7/value`. The pin is
/// expected to be exported and set to output direction by the host
/// provisioning; this process only drives the value file.
pub struct GpioLine {
    value_path: PathBuf,
}

impl GpioLine {
    pub fn open(value_path: impl AsRef<Path>) -> io::Result<Self> {
        let value_path = value_path.as_ref().to_path_buf();
        // Probe once so a missing/unexported pin is caught at startup
        // rather than at the first trip.
        std::fs::metadata(&value_path)?;
        Ok(Self { value_path })
    }
}

impl RelayLine for GpioLine {
    fn write(&mut self, level: bool) -> io::Result<()> {
        std::fs::write(&self.value_path, if level { b"1" } else { b"0" })
    }

    fn read(&self) -> io::Result<bool> {
        let raw = std::fs::read_to_string(&self.value_path)?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected GPIO value {:?}", other),
            )),
        }
    }
}

#[derive(Default)]
struct MockLineState {
    level: bool,
    writes: u64,
    fail_next: u32,
}

/// In-memory relay line for tests and simulation mode. Clones share the
/// same underlying pin so a test can inspect what the actuator drove.
#[derive(Clone, Default)]
pub struct MockLine {
    inner: Arc<Mutex<MockLineState>>,
}

impl MockLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> bool {
        self.inner.lock().level
    }

    pub fn writes(&self) -> u64 {
        self.inner.lock().writes
    }

    /// Make the next `count` writes fail with an I/O error.
    pub fn fail_next_writes(&self, count: u32) {
        self.inner.lock().fail_next = count;
    }
}

impl RelayLine for MockLine {
    fn write(&mut self, level: bool) -> io::Result<()> {
        let mut state = self.inner.lock();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        state.level = level;
        state.writes += 1;
        Ok(())
    }

    fn read(&self) -> io::Result<bool> {
        Ok(self.inner.lock().level)
    }
}
