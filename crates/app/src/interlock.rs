use beamguard_foundation::{InterlockState, TransitionReason};
use beamguard_relay::RelayActuator;
use beamguard_telemetry::{PipelineMetrics, StatusBoard, TriggerDiagnostic};
use beamguard_trigger::{
    ClassificationResult, DebounceStateMachine, FeatureVector, Transition, TriggerConfig,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Single logical owner of the interlock decision: state machine, relay
/// actuator, and status board behind one lock. The pipeline thread and
/// the watchdog thread both drive it through short critical sections;
/// readers use the status board and never take this lock.
pub struct InterlockController {
    machine: DebounceStateMachine,
    actuator: RelayActuator,
    status: StatusBoard,
    metrics: PipelineMetrics,
}

pub type SharedController = Arc<Mutex<InterlockController>>;

impl InterlockController {
    /// Builds the controller and immediately commands the relay to the
    /// disabled position: the interlock starts in Fault and never
    /// trusts pre-restart relay state.
    pub fn new(
        config: &TriggerConfig,
        actuator: RelayActuator,
        status: StatusBoard,
        metrics: PipelineMetrics,
    ) -> Self {
        let mut controller = Self {
            machine: DebounceStateMachine::new(config),
            actuator,
            status,
            metrics,
        };
        controller.apply_state(InterlockState::Fault);
        controller
    }

    pub fn into_shared(self) -> SharedController {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> InterlockState {
        self.machine.state()
    }

    /// One frame's worth of evidence: record diagnostics, feed the state
    /// machine, actuate on any committed transition.
    pub fn handle_features(&mut self, features: &FeatureVector, result: ClassificationResult) {
        let (band_energy, peak_amplitude) = match *features {
            FeatureVector::Measured {
                band_energy,
                peak_amplitude,
                ..
            } => (band_energy, peak_amplitude),
            FeatureVector::Fault(_) => (0.0, 0.0),
        };
        self.status.record_diagnostic(TriggerDiagnostic {
            is_alarm_like: result.is_alarm_like,
            confidence: result.confidence,
            band_energy,
            peak_amplitude,
            fault: features.is_fault(),
        });

        if features.is_fault() {
            PipelineMetrics::incr(&self.metrics.analysis_faults);
            tracing::warn!("Analysis fault: {:?}", features.fault());
        }
        if result.is_alarm_like {
            PipelineMetrics::incr(&self.metrics.alarm_frames);
        }

        let transition = self.machine.observe(result, features.fault());
        self.status
            .set_consecutive_faults(self.machine.consecutive_faults());
        self.commit(transition);
    }

    /// Watchdog expiry: forced Fault from any state, even when the
    /// pipeline thread is wedged. Called from the watchdog thread.
    pub fn handle_watchdog_expired(&mut self) {
        PipelineMetrics::incr(&self.metrics.watchdog_faults);
        let transition = self.machine.watchdog_expired();
        self.commit(transition);
    }

    /// The capture producer is gone and will never resume.
    pub fn handle_source_closed(&mut self) {
        tracing::error!("Audio source closed; latching Fault");
        PipelineMetrics::incr(&self.metrics.watchdog_faults);
        let transition = self.machine.watchdog_expired();
        self.commit(transition);
    }

    /// Operator-requested exit from a latched Fault; re-enters warm-up.
    pub fn reinitialize(&mut self) {
        if let Some(transition) = self.machine.reinitialize() {
            PipelineMetrics::incr(&self.metrics.reinitializations);
            tracing::info!("Re-initialization accepted; warm-up restarting");
            self.status
                .record_transition(transition.to, transition.reason);
            self.status.set_consecutive_faults(0);
        } else {
            tracing::info!(
                "Re-initialization ignored in state {:?}",
                self.machine.state()
            );
        }
    }

    /// Commands the relay to the disabled position before process exit.
    pub fn shutdown(&mut self) {
        self.status
            .record_transition(InterlockState::Fault, TransitionReason::Shutdown);
        self.apply_state(InterlockState::Fault);
        tracing::info!("Interlock commanded to disabled for shutdown");
    }

    fn commit(&mut self, transition: Option<Transition>) {
        let Some(transition) = transition else {
            return;
        };
        match transition.reason {
            TransitionReason::AlarmDetected => {
                PipelineMetrics::incr(&self.metrics.trips);
                tracing::warn!("Audible alarm detected; opening laser interlock");
            }
            TransitionReason::AlarmCleared => {
                tracing::info!("Sustained quiet; re-arming laser interlock");
            }
            _ => {}
        }
        tracing::info!(
            "Interlock transition: {:?} -> {:?} ({:?})",
            transition.from,
            transition.to,
            transition.reason
        );
        self.status
            .record_transition(transition.to, transition.reason);
        self.apply_state(transition.to);
    }

    fn apply_state(&mut self, state: InterlockState) {
        let retries_before = self.actuator.total_retries();
        let applied = self.actuator.apply(state);
        let retried = self.actuator.total_retries() - retries_before;
        for _ in 0..retried {
            PipelineMetrics::incr(&self.metrics.actuation_retries);
        }

        match applied {
            Ok(()) => {
                self.status.set_relay_enabled(self.actuator.read_back().ok());
            }
            Err(e) => {
                PipelineMetrics::incr(&self.metrics.actuation_failures);
                tracing::error!("Relay actuation failed: {}", e);
                if let Some(transition) = self.machine.actuation_failed() {
                    self.status
                        .record_transition(transition.to, transition.reason);
                }
                // Best-effort push toward the fail-safe position; if the
                // hardware is truly gone this fails too and the Fault
                // latch plus the log are all that remain.
                let _ = self.actuator.apply(InterlockState::Fault);
                self.status.set_relay_enabled(self.actuator.read_back().ok());
            }
        }
    }
}
