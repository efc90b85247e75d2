use beamguard_foundation::{InterlockState, TransitionReason};

use crate::config::TriggerConfig;
use crate::types::{ClassificationResult, FeatureFault};

/// A committed state change, for the relay, the status board, and the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: InterlockState,
    pub to: InterlockState,
    pub reason: TransitionReason,
}

/// Debounced interlock decision logic.
///
/// Starts in Fault and stays there until `warmup_frames` consecutive
/// healthy frames prove the pipeline, then arms. Tripping requires
/// `trip_frames` consecutive alarm-like frames; re-arming requires
/// `clear_frames` consecutive quiet frames, with `clear_frames` strictly
/// larger (validated at startup). A latched Fault (watchdog expiry,
/// analysis faults beyond tolerance, or actuation failure) is only left
/// through an explicit `reinitialize`, which restarts warm-up.
pub struct DebounceStateMachine {
    state: InterlockState,
    latched: bool,
    warmup_seen: u32,
    alarm_frames: u32,
    quiet_frames: u32,
    fault_frames: u32,
    trip_frames: u32,
    clear_frames: u32,
    warmup_frames: u32,
    fault_tolerance: u32,
}

impl DebounceStateMachine {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            state: InterlockState::Fault,
            latched: false,
            warmup_seen: 0,
            alarm_frames: 0,
            quiet_frames: 0,
            fault_frames: 0,
            trip_frames: config.trip_frames,
            clear_frames: config.clear_frames,
            warmup_frames: config.warmup_frames,
            fault_tolerance: config.fault_tolerance,
        }
    }

    pub fn state(&self) -> InterlockState {
        self.state
    }

    /// A latched Fault is sticky; the startup/warm-up Fault is not.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn consecutive_faults(&self) -> u32 {
        self.fault_frames
    }

    /// Evaluate one classification result. `fault` carries the analyzer's
    /// pipeline-health signal for frames that failed to convert; such
    /// frames are never counted as quiet.
    pub fn observe(
        &mut self,
        result: ClassificationResult,
        fault: Option<FeatureFault>,
    ) -> Option<Transition> {
        if self.latched {
            return None;
        }

        if fault.is_some() {
            self.fault_frames += 1;
            self.alarm_frames = 0;
            self.quiet_frames = 0;
            // During warm-up the pipeline has not proven healthy yet, so
            // no faults are tolerated at all.
            let in_warmup = self.state == InterlockState::Fault;
            if in_warmup || self.fault_frames > self.fault_tolerance {
                return Some(self.latch(TransitionReason::AnalysisFaults));
            }
            return None;
        }
        self.fault_frames = 0;

        match self.state {
            InterlockState::Fault => {
                // Warm-up: an alarm-like frame is not healthy evidence.
                if result.is_alarm_like {
                    self.warmup_seen = 0;
                } else {
                    self.warmup_seen += 1;
                    if self.warmup_seen >= self.warmup_frames {
                        return Some(self.commit(
                            InterlockState::Armed,
                            TransitionReason::WarmupComplete,
                        ));
                    }
                }
            }
            InterlockState::Armed => {
                if result.is_alarm_like {
                    self.alarm_frames += 1;
                    if self.alarm_frames >= self.trip_frames {
                        return Some(
                            self.commit(InterlockState::Tripped, TransitionReason::AlarmDetected),
                        );
                    }
                } else {
                    self.alarm_frames = 0;
                }
            }
            InterlockState::Tripped => {
                if result.is_alarm_like {
                    self.quiet_frames = 0;
                } else {
                    self.quiet_frames += 1;
                    if self.quiet_frames >= self.clear_frames {
                        return Some(
                            self.commit(InterlockState::Armed, TransitionReason::AlarmCleared),
                        );
                    }
                }
            }
        }
        None
    }

    /// Watchdog expiry forces a latched Fault from any state.
    pub fn watchdog_expired(&mut self) -> Option<Transition> {
        if self.latched {
            return None;
        }
        Some(self.latch(TransitionReason::WatchdogExpired))
    }

    /// Relay write exhausted its retries; the computed state cannot be
    /// trusted to match the hardware.
    pub fn actuation_failed(&mut self) -> Option<Transition> {
        if self.latched {
            return None;
        }
        Some(self.latch(TransitionReason::ActuationFailed))
    }

    /// The only sanctioned path out of a latched Fault: clear the latch
    /// and re-enter warm-up. No-op outside Fault.
    pub fn reinitialize(&mut self) -> Option<Transition> {
        if self.state != InterlockState::Fault {
            return None;
        }
        self.latched = false;
        self.reset_counters();
        Some(Transition {
            from: InterlockState::Fault,
            to: InterlockState::Fault,
            reason: TransitionReason::Reinitialized,
        })
    }

    fn latch(&mut self, reason: TransitionReason) -> Transition {
        self.latched = true;
        let from = self.state;
        self.state = InterlockState::Fault;
        let faults = self.fault_frames;
        self.reset_counters();
        self.fault_frames = faults;
        Transition {
            from,
            to: InterlockState::Fault,
            reason,
        }
    }

    fn commit(&mut self, to: InterlockState, reason: TransitionReason) -> Transition {
        let from = self.state;
        self.state = to;
        self.reset_counters();
        Transition { from, to, reason }
    }

    fn reset_counters(&mut self) {
        self.warmup_seen = 0;
        self.alarm_frames = 0;
        self.quiet_frames = 0;
        self.fault_frames = 0;
    }
}
