//! Apply-now versus defer-until-awake.
//!
//! A profile can only be written while the display is actionable. When a
//! trigger arrives with the display off, the intended period is stored and a
//! wake listener is registered; the next "display became actionable" event
//! replays it.
//!
//! ```text
//!            trigger(p), screen on: apply p
//!          ┌───────────────────────────────┐
//!          ▼                               │
//!       ┌──────┐  trigger(p), screen off  ┌─┴───────────┐
//!       │ Idle │ ───────────────────────▶ │ Deferred(p) │ ◀─┐ trigger(q), screen off:
//!       └──────┘ ◀─────────────────────── └─────────────┘ ──┘ overwrite with q
//!                 display actionable: apply p
//! ```
//!
//! At most one deferred period exists and the last one stored wins. The
//! stored period lives in memory only: when the wake event arrives with
//! nothing stored, for example after a restart, the period is recomputed
//! from the configuration and the current time instead.

use crate::backend::ColorProfileBackend;
use crate::logger::Log;
use crate::power::PowerMonitor;
use crate::time_window::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingState {
    #[default]
    Idle,
    /// One period waiting for the display to wake.
    Deferred(Period),
}

/// Where an applied period came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplySource {
    /// A trigger arrived while the display was actionable.
    Direct,
    /// A stored deferred period was replayed on wake.
    Replayed,
    /// Nothing was stored on wake; the period was derived from configuration.
    Recomputed,
}

/// Outcome of feeding one event to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied {
        period: Period,
        source: ApplySource,
        /// A deferred period discarded because a direct trigger superseded it.
        superseded: Option<Period>,
        /// False when the device write failed. The state is `Idle` either way.
        written: bool,
    },
    Deferred {
        period: Period,
        /// The previously stored period this one overwrote.
        replaced: Option<Period>,
    },
    /// The event had nothing to do.
    Ignored,
}

#[derive(Debug, Default)]
pub struct PendingActionStateMachine {
    state: PendingState,
}

impl PendingActionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PendingState {
        self.state
    }

    /// Forget the stored period, as a process restart would.
    pub fn reset(&mut self) {
        self.state = PendingState::Idle;
    }

    /// A trigger asking for `period`.
    pub fn on_trigger(
        &mut self,
        period: Period,
        backend: &dyn ColorProfileBackend,
        power: &dyn PowerMonitor,
    ) -> Transition {
        if power.is_actionable() {
            let superseded = self.take_deferred();
            if let Some(stale) = superseded {
                Log::log_debug(&format!(
                    "Direct {} trigger supersedes deferred {} action",
                    period, stale
                ));
                power.unregister_wake_listener();
            }

            let written = backend.apply_profile(period).is_ok();
            return Transition::Applied {
                period,
                source: ApplySource::Direct,
                superseded,
                written,
            };
        }

        let replaced = self.take_deferred();
        self.state = PendingState::Deferred(period);

        if power.register_wake_listener() {
            Log::log_decorated(&format!(
                "Screen is off, deferring {} colors until it turns on",
                period
            ));
        } else {
            Log::log_debug(&format!(
                "Screen still off, deferred action is now {}",
                period
            ));
        }

        Transition::Deferred { period, replaced }
    }

    /// The display became actionable.
    ///
    /// Replays the stored period, or asks `recompute` for one when nothing is
    /// stored. If the display turned off again before this ran, the event is
    /// ignored and any stored period keeps waiting.
    pub fn on_device_actionable(
        &mut self,
        backend: &dyn ColorProfileBackend,
        power: &dyn PowerMonitor,
        recompute: impl FnOnce() -> Period,
    ) -> Transition {
        if !power.is_actionable() {
            Log::log_debug("Wake event arrived but the screen is off again");
            // The event that got us here may have consumed the subscription
            if matches!(self.state, PendingState::Deferred(_)) {
                power.register_wake_listener();
            }
            return Transition::Ignored;
        }

        let (period, source) = match self.take_deferred() {
            Some(period) => (period, ApplySource::Replayed),
            None => (recompute(), ApplySource::Recomputed),
        };

        power.unregister_wake_listener();

        let written = backend.apply_profile(period).is_ok();
        Transition::Applied {
            period,
            source,
            superseded: None,
            written,
        }
    }

    fn take_deferred(&mut self) -> Option<Period> {
        match std::mem::take(&mut self.state) {
            PendingState::Deferred(period) => Some(period),
            PendingState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockColorProfileBackend;
    use crate::error::DeviceWriteError;
    use crate::testing::{FakePowerMonitor, RecordingBackend};
    use mockall::predicate::eq;

    #[test]
    fn test_trigger_while_screen_on_applies_directly() {
        let mut backend = MockColorProfileBackend::new();
        backend
            .expect_apply_profile()
            .with(eq(Period::Night))
            .times(1)
            .returning(|_| Ok(()));
        let power = FakePowerMonitor::new(true);
        let mut machine = PendingActionStateMachine::new();

        let transition = machine.on_trigger(Period::Night, &backend, &power);

        assert_eq!(
            transition,
            Transition::Applied {
                period: Period::Night,
                source: ApplySource::Direct,
                superseded: None,
                written: true,
            }
        );
        assert_eq!(machine.state(), PendingState::Idle);
        assert!(!power.is_listener_registered());
    }

    #[test]
    fn test_trigger_while_screen_off_defers() {
        let mut backend = MockColorProfileBackend::new();
        backend.expect_apply_profile().never();
        let power = FakePowerMonitor::new(false);
        let mut machine = PendingActionStateMachine::new();

        let transition = machine.on_trigger(Period::Day, &backend, &power);

        assert_eq!(
            transition,
            Transition::Deferred {
                period: Period::Day,
                replaced: None,
            }
        );
        assert_eq!(machine.state(), PendingState::Deferred(Period::Day));
        assert!(power.is_listener_registered());
    }

    #[test]
    fn test_repeated_deferral_keeps_one_listener_and_last_period() {
        let backend = RecordingBackend::new();
        let power = FakePowerMonitor::new(false);
        let mut machine = PendingActionStateMachine::new();

        machine.on_trigger(Period::Day, &backend, &power);
        machine.on_trigger(Period::Night, &backend, &power);
        let transition = machine.on_trigger(Period::Day, &backend, &power);

        assert_eq!(
            transition,
            Transition::Deferred {
                period: Period::Day,
                replaced: Some(Period::Night),
            }
        );
        assert_eq!(power.registrations(), 1);
        assert!(backend.applied().is_empty());

        power.set_actionable(true);
        machine.on_device_actionable(&backend, &power, || panic!("stored period exists"));

        assert_eq!(backend.applied(), vec![Period::Day]);
        assert_eq!(machine.state(), PendingState::Idle);
        assert!(!power.is_listener_registered());
    }

    #[test]
    fn test_direct_trigger_supersedes_deferred_action() {
        let backend = RecordingBackend::new();
        let power = FakePowerMonitor::new(false);
        let mut machine = PendingActionStateMachine::new();

        machine.on_trigger(Period::Night, &backend, &power);
        power.set_actionable(true);
        let transition = machine.on_trigger(Period::Day, &backend, &power);

        assert_eq!(
            transition,
            Transition::Applied {
                period: Period::Day,
                source: ApplySource::Direct,
                superseded: Some(Period::Night),
                written: true,
            }
        );
        assert_eq!(backend.applied(), vec![Period::Day]);
        assert!(!power.is_listener_registered());

        // The discarded night action must not come back on the next wake
        let transition = machine.on_device_actionable(&backend, &power, || Period::Day);
        assert!(matches!(
            transition,
            Transition::Applied {
                source: ApplySource::Recomputed,
                ..
            }
        ));
    }

    #[test]
    fn test_wake_without_stored_action_recomputes() {
        let backend = RecordingBackend::new();
        let power = FakePowerMonitor::new(false);
        let mut machine = PendingActionStateMachine::new();

        machine.on_trigger(Period::Day, &backend, &power);
        // Simulated restart: the stored period is gone, the listener is not
        machine.reset();
        power.set_actionable(true);

        let transition = machine.on_device_actionable(&backend, &power, || Period::Night);

        assert_eq!(
            transition,
            Transition::Applied {
                period: Period::Night,
                source: ApplySource::Recomputed,
                superseded: None,
                written: true,
            }
        );
        assert_eq!(backend.applied(), vec![Period::Night]);
        assert!(!power.is_listener_registered());
    }

    #[test]
    fn test_wake_while_screen_off_again_keeps_deferred() {
        let backend = RecordingBackend::new();
        let power = FakePowerMonitor::new(false);
        let mut machine = PendingActionStateMachine::new();

        machine.on_trigger(Period::Night, &backend, &power);
        let transition = machine.on_device_actionable(&backend, &power, || Period::Day);

        assert_eq!(transition, Transition::Ignored);
        assert_eq!(machine.state(), PendingState::Deferred(Period::Night));
        assert!(power.is_listener_registered());
        assert!(backend.applied().is_empty());
    }

    #[test]
    fn test_wake_while_screen_off_rearms_consumed_listener() {
        let backend = RecordingBackend::new();
        let power = FakePowerMonitor::new(false);
        let mut machine = PendingActionStateMachine::new();

        machine.on_trigger(Period::Day, &backend, &power);
        // Delivering the wake event ended the subscription
        power.unregister_wake_listener();
        let transition = machine.on_device_actionable(&backend, &power, || Period::Night);

        assert_eq!(transition, Transition::Ignored);
        assert!(power.is_listener_registered());
        assert_eq!(power.registrations(), 2);

        power.set_actionable(true);
        machine.on_device_actionable(&backend, &power, || Period::Night);
        assert_eq!(backend.applied(), vec![Period::Day]);
    }

    #[test]
    fn test_wake_while_idle_and_screen_off_registers_nothing() {
        let backend = RecordingBackend::new();
        let power = FakePowerMonitor::new(false);
        let mut machine = PendingActionStateMachine::new();

        let transition = machine.on_device_actionable(&backend, &power, || Period::Night);

        assert_eq!(transition, Transition::Ignored);
        assert!(!power.is_listener_registered());
        assert_eq!(machine.state(), PendingState::Idle);
    }

    #[test]
    fn test_failed_write_still_returns_to_idle() {
        let mut backend = MockColorProfileBackend::new();
        backend.expect_apply_profile().times(1).returning(|period| {
            Err(DeviceWriteError {
                period,
                failures: Vec::new(),
            })
        });
        let power = FakePowerMonitor::new(false);
        let mut machine = PendingActionStateMachine::new();

        machine.on_trigger(Period::Night, &backend, &power);
        power.set_actionable(true);
        let transition = machine.on_device_actionable(&backend, &power, || Period::Day);

        assert_eq!(
            transition,
            Transition::Applied {
                period: Period::Night,
                source: ApplySource::Replayed,
                superseded: None,
                written: false,
            }
        );
        assert_eq!(machine.state(), PendingState::Idle);
    }
}
