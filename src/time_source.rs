//! Clock abstraction.
//!
//! Everything that needs "now" receives a `TimeSource`, so schedules and the
//! recovery path can be exercised at fixed instants in tests.

use chrono::{DateTime, Duration, Local};
use std::sync::Mutex;

pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// System wall clock.
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
pub struct FixedTimeSource {
    now: Mutex<DateTime<Local>>,
}

impl FixedTimeSource {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
