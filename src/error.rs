//! Error types for the non-fatal failure classes of a dispatch cycle.
//!
//! Neither error ends the process. A failed device write is reported and the
//! next scheduled boundary re-applies the profile; an unknown action is logged
//! and dropped. Application plumbing (config loading, CLI, daemon startup)
//! uses `anyhow` instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::time_window::Period;

/// One device file that could not be written.
#[derive(Debug, Error)]
#[error("{}: {}", .path.display(), .source)]
pub struct DeviceWriteFailure {
    pub path: PathBuf,
    pub source: io::Error,
}

/// A profile was only partially applied, or not at all.
///
/// Every path is attempted independently, so `failures` lists each path that
/// failed while any other path may still have been written.
#[derive(Debug, Error)]
#[error("failed to set {period} colors ({})", describe_failures(.failures))]
pub struct DeviceWriteError {
    pub period: Period,
    pub failures: Vec<DeviceWriteFailure>,
}

impl DeviceWriteError {
    /// Paths that were not written.
    pub fn failed_paths(&self) -> Vec<&PathBuf> {
        self.failures.iter().map(|f| &f.path).collect()
    }
}

fn describe_failures(failures: &[DeviceWriteFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A trigger identifier the dispatcher does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action {0:?} received")]
pub struct UnknownActionError(pub String);
