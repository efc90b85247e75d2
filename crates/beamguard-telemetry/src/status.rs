use beamguard_foundation::{InterlockState, TransitionReason};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// One frame's classification, kept in a bounded ring for diagnostics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TriggerDiagnostic {
    pub is_alarm_like: bool,
    pub confidence: f32,
    pub band_energy: f32,
    pub peak_amplitude: f32,
    pub fault: bool,
}

/// The read contract for the external telemetry component: always exactly
/// one of the three interlock states plus transition metadata, never an
/// error in place of a state. The wire format is owned externally; this
/// struct is merely serializable.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: InterlockState,
    pub last_transition_reason: Option<TransitionReason>,
    /// Milliseconds since the last state transition, if any has occurred.
    pub transition_age_ms: Option<u64>,
    pub consecutive_faults: u32,
    /// Physical relay read-back mapped to "enabled", when available.
    pub relay_enabled: Option<bool>,
    pub recent: Vec<TriggerDiagnostic>,
}

struct Inner {
    state: InterlockState,
    reason: Option<TransitionReason>,
    transition_at: Option<Instant>,
    consecutive_faults: u32,
    relay_enabled: Option<bool>,
    recent: VecDeque<TriggerDiagnostic>,
}

/// Single-writer status cell. The interlock controller writes; everyone
/// else reads snapshots. Initialized to Fault so there is never an
/// "unknown" state visible, even before the first frame.
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<RwLock<Inner>>,
    capacity: usize,
}

impl StatusBoard {
    pub fn new(diagnostics_capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: InterlockState::Fault,
                reason: None,
                transition_at: None,
                consecutive_faults: 0,
                relay_enabled: None,
                recent: VecDeque::with_capacity(diagnostics_capacity),
            })),
            capacity: diagnostics_capacity,
        }
    }

    pub fn record_transition(&self, state: InterlockState, reason: TransitionReason) {
        let mut inner = self.inner.write();
        inner.state = state;
        inner.reason = Some(reason);
        inner.transition_at = Some(Instant::now());
    }

    pub fn record_diagnostic(&self, diagnostic: TriggerDiagnostic) {
        let mut inner = self.inner.write();
        if inner.recent.len() == self.capacity {
            inner.recent.pop_front();
        }
        inner.recent.push_back(diagnostic);
    }

    pub fn set_consecutive_faults(&self, count: u32) {
        self.inner.write().consecutive_faults = count;
    }

    pub fn set_relay_enabled(&self, enabled: Option<bool>) {
        self.inner.write().relay_enabled = enabled;
    }

    pub fn state(&self) -> InterlockState {
        self.inner.read().state
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.read();
        StatusSnapshot {
            state: inner.state,
            last_transition_reason: inner.reason,
            transition_age_ms: inner
                .transition_at
                .map(|at| at.elapsed().as_millis() as u64),
            consecutive_faults: inner.consecutive_faults,
            relay_enabled: inner.relay_enabled,
            recent: inner.recent.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(alarm: bool) -> TriggerDiagnostic {
        TriggerDiagnostic {
            is_alarm_like: alarm,
            confidence: if alarm { 1.0 } else { 0.0 },
            band_energy: 0.0,
            peak_amplitude: 0.0,
            fault: false,
        }
    }

    #[test]
    fn initial_snapshot_reports_fault_not_unknown() {
        let board = StatusBoard::new(8);
        let snap = board.snapshot();
        assert_eq!(snap.state, InterlockState::Fault);
        assert_eq!(snap.last_transition_reason, None);
        assert_eq!(snap.transition_age_ms, None);
        assert!(snap.recent.is_empty());
    }

    #[test]
    fn transition_updates_state_reason_and_timestamp() {
        let board = StatusBoard::new(8);
        board.record_transition(InterlockState::Armed, TransitionReason::WarmupComplete);
        let snap = board.snapshot();
        assert_eq!(snap.state, InterlockState::Armed);
        assert_eq!(
            snap.last_transition_reason,
            Some(TransitionReason::WarmupComplete)
        );
        assert!(snap.transition_age_ms.is_some());
    }

    #[test]
    fn diagnostics_ring_is_bounded() {
        let board = StatusBoard::new(3);
        for i in 0..10 {
            board.record_diagnostic(diagnostic(i % 2 == 0));
        }
        let snap = board.snapshot();
        assert_eq!(snap.recent.len(), 3);
    }
}
