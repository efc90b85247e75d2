use serde::{Deserialize, Serialize};

/// The interlock decision. The relay command is a deterministic function
/// of this value: only `Armed` permits the laser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterlockState {
    /// Laser permitted; relay energized per wiring polarity.
    Armed,
    /// Sustained alarm evidence accumulated; laser disabled.
    Tripped,
    /// Pipeline stall, repeated analysis errors, or actuation failure;
    /// laser disabled. Sticky until an explicit re-initialization.
    Fault,
}

impl InterlockState {
    /// Whether this state commands the "laser enabled" relay level.
    pub fn permits_laser(self) -> bool {
        matches!(self, InterlockState::Armed)
    }
}

/// Why the most recent state transition happened. Carried on the status
/// board and in the transition log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionReason {
    /// Warm-up completed with a healthy frame stream.
    WarmupComplete,
    /// trip_frames consecutive alarm-like classifications.
    AlarmDetected,
    /// clear_frames consecutive quiet classifications.
    AlarmCleared,
    /// No frame within the watchdog interval.
    WatchdogExpired,
    /// Analysis faults beyond the configured tolerance.
    AnalysisFaults,
    /// Relay write failed through all retries.
    ActuationFailed,
    /// Operator-requested re-initialization; warm-up restarts.
    Reinitialized,
    /// Process shutdown; relay forced to disabled.
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_armed_permits_laser() {
        assert!(InterlockState::Armed.permits_laser());
        assert!(!InterlockState::Tripped.permits_laser());
        assert!(!InterlockState::Fault.permits_laser());
    }
}
