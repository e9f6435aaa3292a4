//! Application constants and default values for nightcolors.
//!
//! This module contains all the configuration defaults, validation limits,
//! device paths and operational constants used throughout the application.

// ═══ Application Configuration Defaults ═══
// These values are used when config options are not specified by the user

pub const DEFAULT_PREF_START: u32 = 480; // 08:00 - beginning of the day period
pub const DEFAULT_PREF_END: u32 = 1200; // 20:00 - beginning of the night period

pub const DEFAULT_GREEN_PATH: &str = "/sys/class/misc/samoled_color/green_multiplier";
pub const DEFAULT_BLUE_PATH: &str = "/sys/class/misc/samoled_color/blue_multiplier";

pub const DEFAULT_DAY_MULTIPLIER: u32 = 2_000_000_000; // Full green/blue channel strength
pub const DEFAULT_NIGHT_MULTIPLIER: u32 = 200_000_000; // Green/blue cut to a tenth

// Framebuffer blank state: "0" while the panel is unblanked
pub const DEFAULT_SCREEN_STATE_PATH: &str = "/sys/class/graphics/fb0/blank";
pub const DEFAULT_WAKE_LOCK_NAME: &str = "nightcolors";

// ═══ Validation Limits ═══

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const MAXIMUM_MINUTE_OF_DAY: u32 = MINUTES_PER_DAY - 1; // 23:59

// ═══ Kernel Interfaces ═══

pub const KERNEL_WAKE_LOCK_PATH: &str = "/sys/power/wake_lock";
pub const KERNEL_WAKE_UNLOCK_PATH: &str = "/sys/power/wake_unlock";

// ═══ Action Identifiers ═══
// Identifiers carried by triggers entering the dispatcher

pub const ACTION_DAY: &str = "nightcolors.action.DAY";
pub const ACTION_NIGHT: &str = "nightcolors.action.NIGHT";
pub const ACTION_SCREEN_ON: &str = "nightcolors.action.SCREEN_ON";
pub const ACTION_BOOT_COMPLETED: &str = "nightcolors.action.BOOT_COMPLETED";

// ═══ Operational Timing Constants ═══

pub const ALARM_INTERVAL_SECS: i64 = 24 * 60 * 60; // Daily repeat
pub const ALARM_MAX_SLEEP_SECS: u64 = 60; // Alarm thread re-reads the wall clock at least this often
pub const SCREEN_POLL_INTERVAL_MS: u64 = 1000; // Wake listener polling of the screen state file
pub const CHECK_INTERVAL_SECS: u64 = 1; // How often the main loop checks the running flag

// ═══ Exit Codes ═══

pub const EXIT_FAILURE: i32 = 1; // General failure
