//! Implementation of the --reload command.
//!
//! Validates the configuration on disk, then signals the running daemon with
//! SIGUSR2 so it re-reads the file and reinstalls its alarms.

use anyhow::Result;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::config::Config;
use crate::instance;
use crate::logger::Log;

/// Handle the --reload command.
pub fn handle_reload_command(debug_enabled: bool) -> Result<()> {
    Log::log_version();

    // Fail fast with a clear error message if the new config is invalid
    let config = Config::load()?;
    if debug_enabled {
        config.log_config();
    }

    let lock_path = instance::lock_path();
    let Some(pid) = instance::running_pid(&lock_path) else {
        Log::log_pipe();
        anyhow::bail!(
            "No running nightcolors daemon found.\n\
            Start it with: nightcolors"
        );
    };

    Log::log_block_start("Signaling nightcolors to reload...");

    match kill(Pid::from_raw(pid as i32), Signal::SIGUSR2) {
        Ok(()) => {
            Log::log_decorated(&format!("Sent reload signal to nightcolors (PID: {})", pid));
            Log::log_indented("Alarms will be reinstalled from the new configuration");
        }
        Err(e) => {
            Log::log_pipe();
            anyhow::bail!("Failed to signal nightcolors (PID: {}): {}", pid, e);
        }
    }

    Log::log_block_start("Reload complete");
    Log::log_end();
    Ok(())
}
