//! # nightcolors
//!
//! Switches a display between a day and a night color profile at two
//! configured minutes of the day, by writing channel multipliers to sysfs.
//!
//! ## Architecture
//!
//! - **time_window**: Next day/night boundaries and the current period
//! - **backend**: Color profile backends (sysfs multiplier files)
//! - **alarm**: Daily repeating alarms and the `install_alarms` entry point
//! - **pending**: Apply-now versus defer-until-the-screen-is-on state machine
//! - **dispatcher**: Routes one trigger through the state machine under a wake lock
//! - **wakelock**: Reference-counted wake lock with guaranteed release
//! - **power**: Screen state and the wake listener
//! - **service**: Boot/trigger routing on top of the scheduler and dispatcher
//! - **config**: Configuration loading, validation, and default generation
//! - **logger**: Structured logging with visual formatting
//! - **signals**: Signal handling and the daemon message channel
//! - **instance**: Single-instance lock file
//! - **args** / **commands**: Command-line parsing and one-shot commands

pub mod action;
pub mod alarm;
pub mod args;
pub mod backend;
pub mod commands;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod instance;
pub mod logger;
pub mod pending;
pub mod power;
pub mod service;
pub mod signals;
pub mod time_source;
pub mod time_window;
pub mod wakelock;

#[cfg(any(test, feature = "testing-support"))]
pub mod testing;

// Re-export important types for easier access
pub use action::Action;
pub use alarm::{AlarmId, AlarmScheduler, AlarmService, ThreadAlarmService};
pub use backend::{ColorProfileBackend, SysfsColorWriter};
pub use config::{Config, ConfigSource, FileConfigSource};
pub use dispatcher::WakefulDispatcher;
pub use error::{DeviceWriteError, UnknownActionError};
pub use logger::{Log, LogLevel};
pub use pending::{PendingActionStateMachine, PendingState, Transition};
pub use time_window::{DayNightWindow, Period, is_currently_day, next_occurrence};
pub use wakelock::WakeLock;
