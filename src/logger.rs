//! Structured logging with the nightcolors visual output style.
//!
//! Messages carry a level prefix (`[LOG]`, `[WARN]`, ...) or are drawn as part
//! of a box-drawing tree that groups the events of one dispatch cycle.
//!
//! Logging can be switched off at runtime for quiet one-shot commands and
//! tests, and a separate debug switch gates `log_debug` output.

use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Log level enumeration for categorizing message importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Log,  // Normal operational logs
    Warn, // Warning messages (non-fatal issues)
    Err,  // Error messages (recoverable failures)
    Crit, // Critical errors (may require user intervention)
    Info, // Informational messages (status updates)
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Log => "[LOG] ",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Err => "[ERR] ",
            LogLevel::Crit => "[CRIT] ",
            LogLevel::Info => "[INFO] ",
        }
    }
}

/// Main logging interface providing structured output formatting.
pub struct Log;

impl Log {
    /// Enable or disable all output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Enable or disable debug traces (`--debug`).
    pub fn set_debug(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_debug() -> bool {
        DEBUG_ENABLED.load(Ordering::SeqCst)
    }

    fn shows_debug() -> bool {
        Self::is_enabled() && Self::is_debug()
    }

    /// Main log function with level-based prefixes.
    pub fn log(level: LogLevel, message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("{}{}", level.prefix(), message);
    }

    // ═══ Convenience Methods for Common Log Levels ═══

    pub fn log_error(message: &str) {
        Self::log(LogLevel::Err, message);
    }

    pub fn log_warning(message: &str) {
        Self::log(LogLevel::Warn, message);
    }

    pub fn log_info(message: &str) {
        Self::log(LogLevel::Info, message);
    }

    /// Log a debug line. Only shown when `--debug` is active.
    pub fn log_debug(message: &str) {
        if Self::shows_debug() {
            Self::log(LogLevel::Log, message);
        }
    }

    pub fn log_critical(message: &str) {
        Self::log(LogLevel::Crit, message);
    }

    // ═══ Visual Formatting Functions ═══

    /// Log a decorated message with visual branching indicator.
    pub fn log_decorated(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("┣ {}", message);
    }

    /// Log an indented message for sub-items or details.
    pub fn log_indented(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("┃   {}", message);
    }

    pub fn log_pipe() {
        if !Self::is_enabled() {
            return;
        }
        println!("┃");
    }

    /// Log a block start message with visual separation.
    ///
    /// Used for the start of each dispatch cycle and other phase changes.
    pub fn log_block_start(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("┃");
        println!("┣ {}", message);
    }

    /// Log the application version header.
    pub fn log_version() {
        if !Self::is_enabled() {
            return;
        }
        println!("┏ nightcolors v{} ━━╸", env!("CARGO_PKG_VERSION"));
        println!("┃");
    }

    /// Log the final termination marker.
    pub fn log_end() {
        if !Self::is_enabled() {
            return;
        }
        println!("╹");
    }
}
