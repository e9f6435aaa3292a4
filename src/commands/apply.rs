//! Implementation of the --apply command.
//!
//! Runs a single dispatch cycle for the named trigger, with the same wake
//! lock and screen state checks the daemon uses. A one-shot process cannot
//! wait for the screen to wake, so a deferred result is reported and dropped;
//! the daemon's next boundary or wake event applies the right profile anyway.

use anyhow::Result;
use std::sync::Arc;
use std::sync::mpsc;

use crate::backend::create_backend;
use crate::config::{Config, FileConfigSource};
use crate::dispatcher::WakefulDispatcher;
use crate::logger::Log;
use crate::pending::Transition;
use crate::power::SysfsPowerMonitor;
use crate::time_source::RealTimeSource;
use crate::wakelock::WakeLock;

/// Handle the --apply command.
pub fn handle_apply_command(action: &str, debug_enabled: bool) -> Result<()> {
    Log::log_version();

    let config = Config::load()?;
    if debug_enabled {
        config.log_config();
    }

    let (sender, _receiver) = mpsc::channel();
    let power = Arc::new(SysfsPowerMonitor::new(config.screen_state_path(), sender));
    let dispatcher = WakefulDispatcher::new(
        Arc::new(WakeLock::for_config(&config)),
        Arc::from(create_backend(&config)),
        power.clone(),
        Arc::new(FileConfigSource::new(Config::get_config_path()?)),
        Arc::new(RealTimeSource),
    );

    Log::log_block_start(&format!("Applying {}", action));
    let transition = dispatcher.dispatch(action).map_err(|e| {
        Log::log_pipe();
        anyhow::Error::new(e)
    })?;

    match transition {
        Transition::Applied { written: true, .. } => {}
        Transition::Applied { period, .. } => {
            Log::log_pipe();
            anyhow::bail!("Failed to write the {} profile", period);
        }
        Transition::Deferred { period, .. } => {
            Log::log_warning(&format!("Screen is off, {} colors were not applied", period));
        }
        Transition::Ignored => {
            Log::log_decorated("Nothing to apply for this action");
        }
    }

    power.stop();
    Log::log_end();
    Ok(())
}
