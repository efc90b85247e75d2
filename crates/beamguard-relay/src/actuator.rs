use beamguard_foundation::{real_clock, ActuatorError, InterlockState, SharedClock};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::line::RelayLine;

/// Which line level means "laser enabled". Wiring conventions vary by
/// installation, so polarity is configuration, not code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayPolarity {
    /// High level energizes the interlock (laser enabled on high).
    ActiveHigh,
    /// Low level energizes the interlock (laser enabled on low).
    ActiveLow,
}

impl RelayPolarity {
    fn level_for(self, enabled: bool) -> bool {
        match self {
            RelayPolarity::ActiveHigh => enabled,
            RelayPolarity::ActiveLow => !enabled,
        }
    }
}

/// Maps interlock state to the physical relay with fail-safe semantics:
/// only `Armed` commands the enabled level, writes are idempotent, and a
/// write failure is retried a bounded number of times with backoff before
/// it is reported upward for Fault escalation.
///
/// In-memory knowledge of the line never outlives the process; callers
/// re-initialize to Fault on startup rather than trusting prior state.
pub struct RelayActuator {
    line: Box<dyn RelayLine>,
    polarity: RelayPolarity,
    retry_attempts: u32,
    retry_backoff: Duration,
    last_commanded: Option<bool>,
    total_retries: u64,
    clock: SharedClock,
}

impl RelayActuator {
    pub fn new(
        line: Box<dyn RelayLine>,
        polarity: RelayPolarity,
        retry_attempts: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            line,
            polarity,
            retry_attempts: retry_attempts.max(1),
            retry_backoff,
            last_commanded: None,
            total_retries: 0,
            clock: real_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn apply(&mut self, state: InterlockState) -> Result<(), ActuatorError> {
        let enabled = state.permits_laser();
        let level = self.polarity.level_for(enabled);

        if self.last_commanded == Some(level) {
            return Ok(());
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.line.write(level) {
                Ok(()) => {
                    self.last_commanded = Some(level);
                    tracing::debug!(
                        "Relay commanded: state={:?} enabled={} level={}",
                        state,
                        enabled,
                        level
                    );
                    return Ok(());
                }
                Err(e) if attempt < self.retry_attempts => {
                    self.total_retries += 1;
                    tracing::warn!(
                        "Relay write failed (attempt {}/{}): {}",
                        attempt,
                        self.retry_attempts,
                        e
                    );
                    self.clock.sleep(self.retry_backoff);
                }
                Err(e) => {
                    // Forget the last commanded level so the next apply,
                    // even of the same state, goes back to the hardware.
                    self.last_commanded = None;
                    return Err(ActuatorError::WriteExhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    /// Physical line read-back, mapped through polarity to "enabled".
    pub fn read_back(&self) -> Result<bool, ActuatorError> {
        let level = self.line.read().map_err(ActuatorError::ReadBack)?;
        Ok(level == self.polarity.level_for(true))
    }

    pub fn total_retries(&self) -> u64 {
        self.total_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::MockLine;

    fn actuator(line: &MockLine, polarity: RelayPolarity) -> RelayActuator {
        RelayActuator::new(Box::new(line.clone()), polarity, 3, Duration::ZERO)
    }

    #[test]
    fn only_armed_commands_enabled_level() {
        let line = MockLine::new();
        let mut act = actuator(&line, RelayPolarity::ActiveHigh);

        act.apply(InterlockState::Armed).unwrap();
        assert!(line.level());
        act.apply(InterlockState::Tripped).unwrap();
        assert!(!line.level());
        act.apply(InterlockState::Armed).unwrap();
        assert!(line.level());
        act.apply(InterlockState::Fault).unwrap();
        assert!(!line.level());
    }

    #[test]
    fn active_low_polarity_inverts_the_line() {
        let line = MockLine::new();
        let mut act = actuator(&line, RelayPolarity::ActiveLow);

        act.apply(InterlockState::Armed).unwrap();
        assert!(!line.level());
        act.apply(InterlockState::Tripped).unwrap();
        assert!(line.level());
    }

    #[test]
    fn relay_level_is_deterministic_over_state_sequences() {
        // Pseudo-random walk over all states; the line must always equal
        // the polarity mapping of permits_laser.
        let states = [
            InterlockState::Armed,
            InterlockState::Tripped,
            InterlockState::Armed,
            InterlockState::Fault,
            InterlockState::Fault,
            InterlockState::Armed,
            InterlockState::Tripped,
            InterlockState::Tripped,
            InterlockState::Armed,
            InterlockState::Fault,
        ];
        for polarity in [RelayPolarity::ActiveHigh, RelayPolarity::ActiveLow] {
            let line = MockLine::new();
            let mut act = actuator(&line, polarity);
            for state in states {
                act.apply(state).unwrap();
                assert_eq!(line.level(), polarity.level_for(state.permits_laser()));
            }
        }
    }

    #[test]
    fn reapplying_the_same_state_is_idempotent() {
        let line = MockLine::new();
        let mut act = actuator(&line, RelayPolarity::ActiveHigh);

        act.apply(InterlockState::Armed).unwrap();
        act.apply(InterlockState::Armed).unwrap();
        act.apply(InterlockState::Armed).unwrap();
        assert_eq!(line.writes(), 1);

        // Tripped and Fault command the same level; still one write.
        act.apply(InterlockState::Tripped).unwrap();
        act.apply(InterlockState::Fault).unwrap();
        assert_eq!(line.writes(), 2);
    }

    #[test]
    fn transient_failure_is_retried() {
        let line = MockLine::new();
        let mut act = actuator(&line, RelayPolarity::ActiveHigh);

        line.fail_next_writes(2);
        act.apply(InterlockState::Armed).unwrap();
        assert!(line.level());
        assert_eq!(act.total_retries(), 2);
    }

    #[test]
    fn exhausted_retries_report_actuator_error() {
        let line = MockLine::new();
        let mut act = actuator(&line, RelayPolarity::ActiveHigh);

        line.fail_next_writes(3);
        let err = act.apply(InterlockState::Armed).unwrap_err();
        match err {
            ActuatorError::WriteExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn failure_clears_idempotence_memory() {
        let line = MockLine::new();
        let mut act = actuator(&line, RelayPolarity::ActiveHigh);

        act.apply(InterlockState::Fault).unwrap();
        line.fail_next_writes(3);
        assert!(act.apply(InterlockState::Armed).is_err());

        // The next disable must reach the hardware again even though
        // Fault was the last successfully commanded state.
        act.apply(InterlockState::Fault).unwrap();
        assert!(!line.level());
        assert_eq!(line.writes(), 2);
    }

    #[test]
    fn read_back_maps_polarity() {
        let line = MockLine::new();
        let mut act = actuator(&line, RelayPolarity::ActiveLow);
        act.apply(InterlockState::Armed).unwrap();
        assert!(act.read_back().unwrap());
        act.apply(InterlockState::Tripped).unwrap();
        assert!(!act.read_back().unwrap());
    }
}
