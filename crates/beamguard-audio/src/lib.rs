pub mod capture;
pub mod frame;
pub mod sim;
pub mod source;
pub mod watchdog;

pub use capture::{CaptureConfig, CaptureThread, CapturedSource};
pub use frame::AudioFrame;
pub use sim::{ScriptedSource, SineSource};
pub use source::AudioSource;
pub use watchdog::WatchdogTimer;
