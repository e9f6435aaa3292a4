//! Implementation of the --status command.

use anyhow::Result;
use chrono::Local;

use crate::backend::create_backend;
use crate::config::Config;
use crate::instance;
use crate::logger::Log;
use crate::power::parse_screen_state;
use crate::time_window::DayNightWindow;

/// Print the current period, the next boundary and whether a daemon runs.
pub fn handle_status_command(debug_enabled: bool) -> Result<()> {
    Log::log_version();

    let config = Config::load()?;
    if debug_enabled {
        config.log_config();
    }

    let now = Local::now();
    let window = DayNightWindow::from_config(&config, &now);
    let (next_period, at) = window.next_boundary();
    let remaining = window.time_until_next_boundary(&now);

    Log::log_block_start(&format!("Current period: {}", window.current_period()));
    Log::log_indented(&format!(
        "{} begins at {} (in {}h {}m)",
        next_period,
        at.format("%Y-%m-%d %H:%M"),
        remaining.as_secs() / 3600,
        (remaining.as_secs() % 3600) / 60
    ));

    let backend = create_backend(&config);
    Log::log_block_start(&format!(
        "Color device ({}): {}",
        backend.backend_name(),
        if backend.is_available() {
            "available"
        } else {
            "missing"
        }
    ));

    let screen = match std::fs::read_to_string(config.screen_state_path()) {
        Ok(content) if parse_screen_state(&content) => "on",
        Ok(_) => "off",
        Err(_) => "unknown (treated as on)",
    };
    Log::log_decorated(&format!("Screen: {}", screen));

    match instance::running_pid(&instance::lock_path()) {
        Some(pid) => Log::log_decorated(&format!("Daemon running (PID: {})", pid)),
        None => Log::log_decorated("Daemon not running"),
    }

    Log::log_end();
    Ok(())
}
