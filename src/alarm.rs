//! Daily repeating alarms at the two period boundaries.
//!
//! `AlarmScheduler::install_alarms` is the self-healing entry point: it
//! re-applies the profile for the current period and (re-)registers one alarm
//! per boundary. Alarms are keyed by `AlarmId`, so installing twice replaces
//! the earlier registrations instead of adding to them.
//!
//! Delivery is inexact. An alarm fires at or after its scheduled instant, and
//! the two alarms carry their own action, so late or out-of-order delivery
//! still applies the right period.

use chrono::{DateTime, Duration, Local};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;

use crate::action::Action;
use crate::config::Config;
use crate::constants::{ALARM_INTERVAL_SECS, ALARM_MAX_SLEEP_SECS};
use crate::dispatcher::WakefulDispatcher;
use crate::logger::Log;
use crate::pending::Transition;
use crate::signals::DaemonMessage;
use crate::time_source::TimeSource;
use crate::time_window::{DayNightWindow, Period};

/// Identity of a registered alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlarmId {
    /// Fires when the day period begins.
    Day,
    /// Fires when the night period begins.
    Night,
}

impl AlarmId {
    pub fn period(&self) -> Period {
        match self {
            AlarmId::Day => Period::Day,
            AlarmId::Night => Period::Night,
        }
    }

    /// The trigger delivered when this alarm fires.
    pub fn action(&self) -> Action {
        Action::from(self.period())
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} alarm", self.period())
    }
}

/// A timer service with register-by-identity semantics.
pub trait AlarmService: Send + Sync {
    /// Register a repeating alarm, replacing any earlier one with the same id.
    fn set_inexact_repeating(&self, id: AlarmId, first: DateTime<Local>, interval: Duration);

    /// Remove an alarm. No-op when it is not registered.
    fn cancel(&self, id: AlarmId);
}

#[derive(Debug, Clone, Copy)]
struct Registration {
    next: DateTime<Local>,
    interval: Duration,
}

struct AlarmTable {
    alarms: BTreeMap<AlarmId, Registration>,
    running: bool,
}

struct Shared {
    table: Mutex<AlarmTable>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, AlarmTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Alarm service backed by one timer thread.
///
/// Due alarms are delivered as `DaemonMessage::Trigger` on the daemon
/// channel. The thread re-checks the wall clock at least every
/// `ALARM_MAX_SLEEP_SECS`, so clock changes and suspend are picked up late
/// rather than missed.
pub struct ThreadAlarmService {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadAlarmService {
    pub fn start(sender: Sender<DaemonMessage>, clock: Arc<dyn TimeSource>) -> Self {
        let shared = Arc::new(Shared {
            table: Mutex::new(AlarmTable {
                alarms: BTreeMap::new(),
                running: true,
            }),
            changed: Condvar::new(),
        });

        let thread_shared = shared.clone();
        let handle = thread::spawn(move || run_alarm_loop(&thread_shared, &sender, clock.as_ref()));

        Self {
            shared,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Next scheduled fire time of `id`.
    pub fn next_fire(&self, id: AlarmId) -> Option<DateTime<Local>> {
        self.shared.lock().alarms.get(&id).map(|r| r.next)
    }

    pub fn registered_ids(&self) -> Vec<AlarmId> {
        self.shared.lock().alarms.keys().copied().collect()
    }

    /// Stop the timer thread. Registered alarms are discarded.
    pub fn stop(&self) {
        {
            let mut table = self.shared.lock();
            table.running = false;
            table.alarms.clear();
        }
        self.shared.changed.notify_all();

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl AlarmService for ThreadAlarmService {
    fn set_inexact_repeating(&self, id: AlarmId, first: DateTime<Local>, interval: Duration) {
        self.shared.lock().alarms.insert(
            id,
            Registration {
                next: first,
                interval,
            },
        );
        self.shared.changed.notify_all();
    }

    fn cancel(&self, id: AlarmId) {
        if self.shared.lock().alarms.remove(&id).is_some() {
            self.shared.changed.notify_all();
        }
    }
}

impl Drop for ThreadAlarmService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_alarm_loop(shared: &Shared, sender: &Sender<DaemonMessage>, clock: &dyn TimeSource) {
    let max_sleep = StdDuration::from_secs(ALARM_MAX_SLEEP_SECS);
    let mut table = shared.lock();

    while table.running {
        let now = clock.now();

        let mut due = Vec::new();
        for (id, registration) in table.alarms.iter_mut() {
            if registration.next <= now {
                due.push(*id);
                registration.next = advance_past(registration.next, registration.interval, now);
            }
        }

        if !due.is_empty() {
            // Deliver without holding the table so registrations are not blocked
            drop(table);
            for id in due {
                Log::log_debug(&format!("{} fired", id));
                if sender
                    .send(DaemonMessage::Trigger(id.action().id().to_string()))
                    .is_err()
                {
                    return;
                }
            }
            table = shared.lock();
            continue;
        }

        let wait = table
            .alarms
            .values()
            .filter_map(|r| (r.next - now).to_std().ok())
            .min()
            .unwrap_or(max_sleep)
            .min(max_sleep);

        table = match shared.changed.wait_timeout(table, wait) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        };
    }
}

/// First `next + k * interval` (k >= 1) strictly after `now`.
///
/// Missed repetitions are skipped rather than delivered in a burst.
pub fn advance_past(
    next: DateTime<Local>,
    interval: Duration,
    now: DateTime<Local>,
) -> DateTime<Local> {
    let step = interval.num_seconds().max(1);
    let behind = (now - next).num_seconds().max(0);
    next + Duration::seconds(step * (behind / step + 1))
}

/// Result of one `install_alarms` call.
#[derive(Debug, Clone)]
pub struct Installation {
    pub window: DayNightWindow<Local>,
    /// The period that was applied immediately.
    pub period: Period,
    pub transition: Transition,
}

/// Registers the two daily alarms and re-applies the current profile.
pub struct AlarmScheduler {
    service: Arc<dyn AlarmService>,
    dispatcher: Arc<WakefulDispatcher>,
}

impl AlarmScheduler {
    pub fn new(service: Arc<dyn AlarmService>, dispatcher: Arc<WakefulDispatcher>) -> Self {
        Self {
            service,
            dispatcher,
        }
    }

    /// Compute both boundaries from `config` at `now`, apply the current
    /// period, and register one daily alarm per boundary.
    ///
    /// Calling this again with the same inputs registers the same two
    /// instants; it never adds alarms.
    pub fn install_alarms(&self, config: &Config, now: &DateTime<Local>) -> Installation {
        let window = DayNightWindow::from_config(config, now);
        let period = window.current_period();

        Log::log_block_start(&format!("Installing alarms, current period is {}", period));
        let transition = self.dispatcher.dispatch_action(Action::from(period));

        let interval = Duration::seconds(ALARM_INTERVAL_SECS);
        self.service
            .set_inexact_repeating(AlarmId::Night, window.next_night_begin, interval);
        self.service
            .set_inexact_repeating(AlarmId::Day, window.next_day_begin, interval);

        Log::log_decorated(&format!(
            "Next night begins {}",
            window.next_night_begin.format("%d %H:%M")
        ));
        Log::log_decorated(&format!(
            "Next day begins {}",
            window.next_day_begin.format("%d %H:%M")
        ));

        Installation {
            window,
            period,
            transition,
        }
    }

    /// Remove both alarms.
    pub fn cancel_alarms(&self) {
        self.service.cancel(AlarmId::Night);
        self.service.cancel(AlarmId::Day);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test_constants::*;
    use crate::pending::ApplySource;
    use crate::testing::{
        FakePowerMonitor, FixedTimeSource, RecordingAlarmService, RecordingBackend, WakeLockProbe,
    };
    use crate::time_source::RealTimeSource;
    use chrono::TimeZone;
    use std::sync::mpsc;

    fn local(d: u32, h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, d, h, m, 0).unwrap()
    }

    fn standard_config() -> Config {
        Config {
            pref_start: Some(TEST_STANDARD_START),
            pref_end: Some(TEST_STANDARD_END),
            ..Config::default()
        }
    }

    fn scheduler() -> (AlarmScheduler, Arc<RecordingAlarmService>, Arc<RecordingBackend>) {
        let service = Arc::new(RecordingAlarmService::new());
        let backend = Arc::new(RecordingBackend::new());
        let dispatcher = Arc::new(WakefulDispatcher::new(
            Arc::new(WakeLockProbe::new().wake_lock()),
            backend.clone(),
            Arc::new(FakePowerMonitor::new(true)),
            Arc::new(standard_config()),
            Arc::new(FixedTimeSource::new(local(15, 12, 0))),
        ));
        (
            AlarmScheduler::new(service.clone(), dispatcher),
            service,
            backend,
        )
    }

    #[test]
    fn test_install_before_day_begins() {
        let (scheduler, service, backend) = scheduler();

        let installation = scheduler.install_alarms(&standard_config(), &local(15, 6, 0));

        assert_eq!(installation.period, Period::Night);
        assert!(matches!(
            installation.transition,
            Transition::Applied {
                period: Period::Night,
                source: ApplySource::Direct,
                ..
            }
        ));
        assert_eq!(backend.applied(), vec![Period::Night]);
        assert_eq!(service.get(AlarmId::Day).unwrap().first, local(15, 8, 0));
        assert_eq!(service.get(AlarmId::Night).unwrap().first, local(15, 20, 0));
    }

    #[test]
    fn test_install_after_night_begins() {
        let (scheduler, service, backend) = scheduler();

        let installation = scheduler.install_alarms(&standard_config(), &local(15, 21, 0));

        assert_eq!(installation.period, Period::Night);
        assert_eq!(backend.applied(), vec![Period::Night]);
        assert_eq!(service.get(AlarmId::Night).unwrap().first, local(16, 20, 0));
        assert_eq!(service.get(AlarmId::Day).unwrap().first, local(16, 8, 0));
    }

    #[test]
    fn test_install_during_day() {
        let (scheduler, service, backend) = scheduler();

        let installation = scheduler.install_alarms(&standard_config(), &local(15, 12, 0));

        assert_eq!(installation.period, Period::Day);
        assert_eq!(backend.applied(), vec![Period::Day]);
        assert_eq!(
            service.get(AlarmId::Day).unwrap().interval,
            Duration::hours(24)
        );
    }

    #[test]
    fn test_reinstall_replaces_registrations() {
        let (scheduler, service, _backend) = scheduler();
        let now = local(15, 6, 0);

        scheduler.install_alarms(&standard_config(), &now);
        let first = service.registered();
        scheduler.install_alarms(&standard_config(), &now);

        assert_eq!(service.registered(), first);
        assert_eq!(service.registered().len(), 2);
        assert_eq!(service.set_calls(), 4);

        scheduler.cancel_alarms();
        assert!(service.registered().is_empty());
    }

    #[test]
    fn test_advance_past_skips_missed_repetitions() {
        let day = Duration::hours(24);
        let next = local(10, 20, 0);

        assert_eq!(advance_past(next, day, local(10, 20, 0)), local(11, 20, 0));
        assert_eq!(advance_past(next, day, local(10, 21, 0)), local(11, 20, 0));
        assert_eq!(advance_past(next, day, local(13, 19, 0)), local(13, 20, 0));
        assert_eq!(advance_past(next, day, local(13, 20, 0)), local(14, 20, 0));
    }

    #[test]
    fn test_thread_service_replaces_by_identity() {
        let (tx, _rx) = mpsc::channel();
        let service = ThreadAlarmService::start(tx, Arc::new(RealTimeSource));
        let later = Local::now() + Duration::hours(2);
        let even_later = Local::now() + Duration::hours(3);

        service.set_inexact_repeating(AlarmId::Night, later, Duration::hours(24));
        service.set_inexact_repeating(AlarmId::Night, even_later, Duration::hours(24));

        assert_eq!(service.registered_ids(), vec![AlarmId::Night]);
        assert_eq!(service.next_fire(AlarmId::Night), Some(even_later));

        service.cancel(AlarmId::Night);
        service.cancel(AlarmId::Night);
        assert!(service.registered_ids().is_empty());
        service.stop();
    }

    #[test]
    fn test_thread_service_fires_due_alarm_and_reschedules() {
        let (tx, rx) = mpsc::channel();
        let service = ThreadAlarmService::start(tx, Arc::new(RealTimeSource));
        let past = Local::now() - Duration::seconds(5);

        service.set_inexact_repeating(AlarmId::Day, past, Duration::hours(24));

        let message = rx.recv_timeout(StdDuration::from_secs(5)).unwrap();
        assert_eq!(
            message,
            DaemonMessage::Trigger(Action::Day.id().to_string())
        );
        let next = service.next_fire(AlarmId::Day).unwrap();
        assert_eq!(next, past + Duration::hours(24));
        assert!(next > Local::now());
        service.stop();
    }
}
