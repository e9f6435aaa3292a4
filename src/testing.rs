//! In-memory doubles for the dispatcher's collaborators.
//!
//! Available to unit tests and, through the `testing-support` feature, to the
//! integration tests under `tests/`.

use chrono::{DateTime, Duration, Local};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::alarm::{AlarmId, AlarmService};
use crate::backend::ColorProfileBackend;
use crate::error::{DeviceWriteError, DeviceWriteFailure};
use crate::power::PowerMonitor;
use crate::time_window::Period;
use crate::wakelock::{SystemWakeLock, WakeLock};

pub use crate::time_source::FixedTimeSource;

/// Records every profile it is asked to apply.
#[derive(Default)]
pub struct RecordingBackend {
    applied: Mutex<Vec<Period>>,
    failing: AtomicBool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail with a missing-device error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every period passed to `apply_profile`, including failed attempts.
    pub fn applied(&self) -> Vec<Period> {
        self.applied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last_applied(&self) -> Option<Period> {
        self.applied().last().copied()
    }
}

impl ColorProfileBackend for RecordingBackend {
    fn apply_profile(&self, period: Period) -> Result<(), DeviceWriteError> {
        self.applied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(period);

        if self.failing.load(Ordering::SeqCst) {
            return Err(DeviceWriteError {
                period,
                failures: vec![DeviceWriteFailure {
                    path: PathBuf::from("/nonexistent/green_multiplier"),
                    source: io::Error::new(io::ErrorKind::NotFound, "no such device"),
                }],
            });
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

/// Power monitor whose screen state is set by the test.
pub struct FakePowerMonitor {
    actionable: AtomicBool,
    registered: AtomicBool,
    registrations: AtomicUsize,
}

impl FakePowerMonitor {
    pub fn new(actionable: bool) -> Self {
        Self {
            actionable: AtomicBool::new(actionable),
            registered: AtomicBool::new(false),
            registrations: AtomicUsize::new(0),
        }
    }

    pub fn set_actionable(&self, actionable: bool) {
        self.actionable.store(actionable, Ordering::SeqCst);
    }

    /// How many registrations actually created a subscription.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

impl PowerMonitor for FakePowerMonitor {
    fn is_actionable(&self) -> bool {
        self.actionable.load(Ordering::SeqCst)
    }

    fn register_wake_listener(&self) -> bool {
        let newly = !self.registered.swap(true, Ordering::SeqCst);
        if newly {
            self.registrations.fetch_add(1, Ordering::SeqCst);
        }
        newly
    }

    fn unregister_wake_listener(&self) {
        self.registered.store(false, Ordering::SeqCst);
    }

    fn is_listener_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }
}

/// A registered repeating alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedAlarm {
    pub first: DateTime<Local>,
    pub interval: Duration,
}

/// Alarm service that only remembers registrations.
#[derive(Default)]
pub struct RecordingAlarmService {
    alarms: Mutex<BTreeMap<AlarmId, RecordedAlarm>>,
    set_calls: AtomicUsize,
}

impl RecordingAlarmService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AlarmId) -> Option<RecordedAlarm> {
        self.alarms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .copied()
    }

    pub fn registered(&self) -> BTreeMap<AlarmId, RecordedAlarm> {
        self.alarms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }
}

impl AlarmService for RecordingAlarmService {
    fn set_inexact_repeating(&self, id: AlarmId, first: DateTime<Local>, interval: Duration) {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.alarms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, RecordedAlarm { first, interval });
    }

    fn cancel(&self, id: AlarmId) {
        self.alarms
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}

/// Observes the system lock behind a [`WakeLock`].
#[derive(Clone, Default)]
pub struct WakeLockProbe {
    created: Arc<AtomicUsize>,
    acquires: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    held: Arc<AtomicBool>,
}

impl WakeLockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wake lock whose system lock reports to this probe.
    pub fn wake_lock(&self) -> WakeLock {
        let probe = self.clone();
        WakeLock::new(move || -> Box<dyn SystemWakeLock> {
            probe.created.fetch_add(1, Ordering::SeqCst);
            Box::new(CountingWakeLock {
                probe: probe.clone(),
            })
        })
    }

    /// Number of times the system lock was constructed.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Whether the system lock is currently taken.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

/// System lock that counts calls instead of touching the kernel.
pub struct CountingWakeLock {
    probe: WakeLockProbe,
}

impl SystemWakeLock for CountingWakeLock {
    fn acquire(&mut self) -> io::Result<()> {
        self.probe.acquires.fetch_add(1, Ordering::SeqCst);
        self.probe.held.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
        self.probe.held.store(false, Ordering::SeqCst);
        Ok(())
    }
}
