//! Entry point for every trigger.
//!
//! Each dispatch holds the shared wake lock for its whole duration and runs
//! one state machine transition under the machine's mutex, so triggers from
//! the alarms, the screen watcher and the CLI never interleave a
//! read-modify-write of the pending state.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::action::Action;
use crate::backend::ColorProfileBackend;
use crate::config::{Config, ConfigSource};
use crate::error::UnknownActionError;
use crate::logger::Log;
use crate::pending::{PendingActionStateMachine, PendingState, Transition};
use crate::power::PowerMonitor;
use crate::time_source::TimeSource;
use crate::time_window::{Period, period_at};
use crate::wakelock::WakeLock;

pub struct WakefulDispatcher {
    wake_lock: Arc<WakeLock>,
    machine: Mutex<PendingActionStateMachine>,
    backend: Mutex<Arc<dyn ColorProfileBackend>>,
    power: Arc<dyn PowerMonitor>,
    config_source: Arc<dyn ConfigSource>,
    clock: Arc<dyn TimeSource>,
}

impl WakefulDispatcher {
    pub fn new(
        wake_lock: Arc<WakeLock>,
        backend: Arc<dyn ColorProfileBackend>,
        power: Arc<dyn PowerMonitor>,
        config_source: Arc<dyn ConfigSource>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            wake_lock,
            machine: Mutex::new(PendingActionStateMachine::new()),
            backend: Mutex::new(backend),
            power,
            config_source,
            clock,
        }
    }

    /// Route a trigger identifier.
    ///
    /// Unknown identifiers are logged and returned as an error; nothing else
    /// happens for them.
    pub fn dispatch(&self, id: &str) -> Result<Transition, UnknownActionError> {
        match Action::parse(id) {
            Ok(action) => Ok(self.dispatch_action(action)),
            Err(e) => {
                Log::log_warning(&format!("Ignoring {}", e));
                Err(e)
            }
        }
    }

    pub fn dispatch_action(&self, action: Action) -> Transition {
        self.with_wake_lock(|| {
            Log::log_debug(&format!("Dispatching {}", action));

            let backend = self.backend();
            let mut machine = self.machine();

            match action {
                Action::Day => {
                    machine.on_trigger(Period::Day, backend.as_ref(), self.power.as_ref())
                }
                Action::Night => {
                    machine.on_trigger(Period::Night, backend.as_ref(), self.power.as_ref())
                }
                Action::ScreenOn => machine.on_device_actionable(
                    backend.as_ref(),
                    self.power.as_ref(),
                    || self.recompute_period(),
                ),
                Action::BootCompleted => {
                    // Installing alarms is the service's job, not a transition
                    Log::log_debug("Boot notification reached the dispatcher, ignoring");
                    Transition::Ignored
                }
            }
        })
    }

    /// Run `f` while holding the shared wake lock.
    pub fn with_wake_lock<T>(&self, f: impl FnOnce() -> T) -> T {
        self.wake_lock.with_wake_lock(f)
    }

    /// Period implied by a fresh read of the configuration at the current time.
    ///
    /// This is the recovery path when the stored deferred period was lost, so
    /// it never fails: an unreadable configuration falls back to defaults.
    pub fn recompute_period(&self) -> Period {
        let config = self.config_source.current().unwrap_or_else(|e| {
            Log::log_warning(&format!(
                "Failed to re-read configuration, using defaults: {:#}",
                e
            ));
            Config::default()
        });

        let period = period_at(&config, &self.clock.now());
        Log::log_debug(&format!("Recomputed current period: {}", period));
        period
    }

    pub fn pending_state(&self) -> PendingState {
        self.machine().state()
    }

    /// Swap the color backend, e.g. after the device paths changed.
    ///
    /// Any deferred period is kept and will be applied through the new one.
    pub fn replace_backend(&self, backend: Arc<dyn ColorProfileBackend>) {
        Log::log_debug(&format!("Switching to the {} backend", backend.backend_name()));
        *self.backend.lock().unwrap_or_else(|e| e.into_inner()) = backend;
    }

    pub fn wake_lock(&self) -> &WakeLock {
        &self.wake_lock
    }

    fn backend(&self) -> Arc<dyn ColorProfileBackend> {
        self.backend
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn machine(&self) -> MutexGuard<'_, PendingActionStateMachine> {
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop the in-memory pending state, as a process restart would.
    #[cfg(any(test, feature = "testing-support"))]
    pub fn forget_pending(&self) {
        self.machine().reset();
    }
}
