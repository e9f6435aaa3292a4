use anyhow::{Context, Result};
use std::{
    sync::Arc,
    sync::atomic::Ordering,
    sync::mpsc::RecvTimeoutError,
    time::Duration,
};

use nightcolors::{
    alarm::ThreadAlarmService,
    args::{CliAction, ParsedArgs, display_help, display_version_info},
    backend::create_backend,
    commands,
    config::{Config, ConfigSource, FileConfigSource},
    constants::*,
    dispatcher::WakefulDispatcher,
    instance::{self, InstanceLock},
    logger::Log,
    power::SysfsPowerMonitor,
    service::{NightColorsService, Outcome},
    signals::{DaemonMessage, setup_signal_handler},
    time_source::{RealTimeSource, TimeSource},
    wakelock::WakeLock,
};

const CHECK_INTERVAL: Duration = Duration::from_secs(CHECK_INTERVAL_SECS);

fn main() -> Result<()> {
    let parsed = ParsedArgs::from_env();

    match parsed.action {
        CliAction::ShowVersion => {
            display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Reload { debug_enabled } => {
            Log::set_debug(debug_enabled);
            commands::reload::handle_reload_command(debug_enabled)
        }
        CliAction::Status { debug_enabled } => {
            Log::set_debug(debug_enabled);
            commands::status::handle_status_command(debug_enabled)
        }
        CliAction::Apply {
            debug_enabled,
            action,
        } => {
            Log::set_debug(debug_enabled);
            commands::apply::handle_apply_command(&action, debug_enabled)
        }
        CliAction::Run { debug_enabled } => {
            Log::set_debug(debug_enabled);
            run_daemon(debug_enabled)
        }
    }
}

/// Run the scheduler until a shutdown signal arrives.
///
/// Startup counts as the boot notification: alarms are installed and the
/// current profile applied before the loop starts waiting for triggers.
fn run_daemon(debug_enabled: bool) -> Result<()> {
    Log::log_version();

    let lock_path = instance::lock_path();
    let Some(instance_lock) = InstanceLock::acquire(&lock_path)? else {
        Log::log_error(
            "Another instance of nightcolors is already running.\n\
            • Use nightcolors --reload to apply configuration changes.",
        );
        std::process::exit(EXIT_FAILURE);
    };
    Log::log_decorated("Lock acquired, starting nightcolors...");

    let config_path = Config::get_config_path()?;
    let config = Config::load()?;
    config.log_config();

    let signal_state = setup_signal_handler(debug_enabled)?;

    let clock: Arc<dyn TimeSource> = Arc::new(RealTimeSource);
    let config_source: Arc<dyn ConfigSource> = Arc::new(FileConfigSource::new(config_path));
    let power = Arc::new(SysfsPowerMonitor::new(
        config.screen_state_path(),
        signal_state.sender.clone(),
    ));
    let alarms = Arc::new(ThreadAlarmService::start(
        signal_state.sender.clone(),
        clock.clone(),
    ));

    let dispatcher = Arc::new(WakefulDispatcher::new(
        Arc::new(WakeLock::for_config(&config)),
        Arc::from(create_backend(&config)),
        power.clone(),
        config_source.clone(),
        clock.clone(),
    ));
    let service = NightColorsService::new(
        alarms.clone(),
        dispatcher,
        config_source.clone(),
        clock,
    );

    if let Err(e) = service.handle_trigger(ACTION_BOOT_COMPLETED) {
        Log::log_warning(&format!("Initial installation failed: {}", e));
    }

    while signal_state.running.load(Ordering::SeqCst) {
        match signal_state.receiver.recv_timeout(CHECK_INTERVAL) {
            Ok(DaemonMessage::Trigger(id)) => {
                Log::log_pipe();
                match service.handle_trigger(&id) {
                    Ok(Outcome::Dispatched(transition)) => {
                        Log::log_debug(&format!("{} -> {:?}", id, transition));
                    }
                    Ok(Outcome::Installed(installation)) => {
                        Log::log_debug(&format!(
                            "Alarms reinstalled, current period {}",
                            installation.period
                        ));
                    }
                    // Already logged by the service
                    Err(_) => {}
                }
            }
            Ok(DaemonMessage::Reload) => reload(&service, config_source.as_ref()),
            Ok(DaemonMessage::Shutdown) => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Log::log_block_start("Shutting down nightcolors...");
    Log::log_decorated("Performing cleanup...");
    service.scheduler().cancel_alarms();
    alarms.stop();
    power.stop();
    drop(instance_lock);
    Log::log_decorated("Cleanup complete");
    Log::log_end();

    Ok(())
}

/// Re-read the configuration and reinstall alarms from it.
///
/// An invalid file keeps the previous alarms and backend in place.
fn reload(service: &NightColorsService, config_source: &dyn ConfigSource) {
    let config = match config_source
        .current()
        .context("Configuration reload failed")
    {
        Ok(config) => config,
        Err(e) => {
            Log::log_error(&format!("{:#}", e));
            Log::log_indented("Keeping the previous configuration");
            return;
        }
    };

    config.log_config();
    service
        .dispatcher()
        .replace_backend(Arc::from(create_backend(&config)));
    service.install(&config);
    Log::log_block_start("Configuration reloaded");
}
