//! Top-level trigger routing.
//!
//! The boot notification installs alarms; every other trigger goes through
//! the wakeful dispatcher.

use std::sync::Arc;

use crate::action::Action;
use crate::alarm::{AlarmScheduler, AlarmService, Installation};
use crate::config::{Config, ConfigSource};
use crate::dispatcher::WakefulDispatcher;
use crate::error::UnknownActionError;
use crate::logger::Log;
use crate::pending::Transition;
use crate::time_source::TimeSource;

/// What handling one trigger did.
#[derive(Debug, Clone)]
pub enum Outcome {
    Installed(Installation),
    Dispatched(Transition),
}

pub struct NightColorsService {
    scheduler: AlarmScheduler,
    dispatcher: Arc<WakefulDispatcher>,
    config_source: Arc<dyn ConfigSource>,
    clock: Arc<dyn TimeSource>,
}

impl NightColorsService {
    pub fn new(
        alarms: Arc<dyn AlarmService>,
        dispatcher: Arc<WakefulDispatcher>,
        config_source: Arc<dyn ConfigSource>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            scheduler: AlarmScheduler::new(alarms, dispatcher.clone()),
            dispatcher,
            config_source,
            clock,
        }
    }

    pub fn handle_trigger(&self, id: &str) -> Result<Outcome, UnknownActionError> {
        let action = Action::parse(id).inspect_err(|e| {
            Log::log_warning(&format!("Ignoring {}", e));
        })?;

        Ok(match action {
            Action::BootCompleted => Outcome::Installed(self.reinstall()),
            other => Outcome::Dispatched(self.dispatcher.dispatch_action(other)),
        })
    }

    /// Install alarms from a fresh read of the configuration.
    pub fn reinstall(&self) -> Installation {
        let config = self.config_source.current().unwrap_or_else(|e| {
            Log::log_warning(&format!(
                "Failed to read configuration, using defaults: {:#}",
                e
            ));
            Config::default()
        });
        self.install(&config)
    }

    /// Install alarms for `config` at the current time.
    pub fn install(&self, config: &Config) -> Installation {
        let now = self.clock.now();
        self.scheduler.install_alarms(config, &now)
    }

    pub fn dispatcher(&self) -> &WakefulDispatcher {
        &self.dispatcher
    }

    pub fn scheduler(&self) -> &AlarmScheduler {
        &self.scheduler
    }
}
