//! Backend abstraction for applying a color profile to the display.
//!
//! A backend turns a `Period` into device writes. It holds no scheduling
//! state: deciding *when* a profile may be written is the job of the pending
//! action state machine, which only calls `apply_profile` while the display is
//! actionable.
//!
//! ## Supported Backends
//!
//! - **Sysfs**: writes decimal multipliers to the green and blue channel files
//!   of a panel driver (`/sys/class/misc/samoled_color/` on Samsung AMOLED
//!   kernels).

use crate::config::Config;
use crate::error::DeviceWriteError;
use crate::logger::Log;
use crate::time_window::Period;

pub mod sysfs;

pub use sysfs::SysfsColorWriter;

/// Applies day or night colors to the display.
#[cfg_attr(test, mockall::automock)]
pub trait ColorProfileBackend: Send + Sync {
    /// Write the profile for `period`.
    ///
    /// Implementations attempt every device write even when an earlier one
    /// fails and report all failures together. A failure is never retried
    /// here; the next scheduled boundary applies the profile again.
    fn apply_profile(&self, period: Period) -> Result<(), DeviceWriteError>;

    /// Whether the device files exist at all.
    fn is_available(&self) -> bool;

    /// Short name used in status output and logs.
    fn backend_name(&self) -> &'static str;
}

/// Create the backend described by `config`.
pub fn create_backend(config: &Config) -> Box<dyn ColorProfileBackend> {
    let backend = SysfsColorWriter::from_config(config);
    Log::log_debug(&format!("Using the {} backend", backend.backend_name()));

    if !backend.is_available() {
        Log::log_pipe();
        Log::log_warning("Color multiplier files not found on this device");
        Log::log_indented(&format!("Expected {}", config.green_path().display()));
        Log::log_indented(&format!("Expected {}", config.blue_path().display()));
        Log::log_indented("Profile changes will be attempted but are expected to fail");
    }

    Box::new(backend)
}
