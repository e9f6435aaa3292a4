//! Sysfs color multiplier writer.
//!
//! The panel driver exposes one file per color channel. Each accepts a decimal
//! ASCII integer; the red channel is left alone, so lowering green and blue
//! shifts the display towards warm colors.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::ColorProfileBackend;
use crate::config::Config;
use crate::error::{DeviceWriteError, DeviceWriteFailure};
use crate::logger::Log;
use crate::time_window::Period;

#[derive(Debug, Clone)]
pub struct SysfsColorWriter {
    green_path: PathBuf,
    blue_path: PathBuf,
    day_multiplier: u32,
    night_multiplier: u32,
}

impl SysfsColorWriter {
    pub fn new(
        green_path: PathBuf,
        blue_path: PathBuf,
        day_multiplier: u32,
        night_multiplier: u32,
    ) -> Self {
        Self {
            green_path,
            blue_path,
            day_multiplier,
            night_multiplier,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.green_path(),
            config.blue_path(),
            config.multiplier_for(Period::Day),
            config.multiplier_for(Period::Night),
        )
    }

    pub fn multiplier_for(&self, period: Period) -> u32 {
        match period {
            Period::Day => self.day_multiplier,
            Period::Night => self.night_multiplier,
        }
    }

    pub fn paths(&self) -> [&Path; 2] {
        [self.green_path.as_path(), self.blue_path.as_path()]
    }
}

/// Write `value` to an existing device file.
///
/// Device attributes cannot be created, so a missing file is an error rather
/// than something to create.
fn write_value(path: &Path, value: u32) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(value.to_string().as_bytes())?;
    file.flush()
}

impl ColorProfileBackend for SysfsColorWriter {
    fn apply_profile(&self, period: Period) -> Result<(), DeviceWriteError> {
        let value = self.multiplier_for(period);

        let failures: Vec<DeviceWriteFailure> = self
            .paths()
            .into_iter()
            .filter_map(|path| {
                write_value(path, value).err().map(|source| DeviceWriteFailure {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .collect();

        if failures.is_empty() {
            Log::log_decorated(&format!("Set {} colors", period));
            return Ok(());
        }

        let err = DeviceWriteError { period, failures };
        Log::log_error(&format!("Error setting {} colors", period));
        for failure in &err.failures {
            Log::log_indented(&failure.to_string());
        }
        Err(err)
    }

    fn is_available(&self) -> bool {
        self.paths().iter().all(|path| path.exists())
    }

    fn backend_name(&self) -> &'static str {
        "sysfs"
    }
}
