//! Single-instance lock file.
//!
//! The daemon takes an exclusive `flock` on `$XDG_RUNTIME_DIR/nightcolors.lock`
//! and writes its PID into it, which is how `--reload` and `--status` find
//! the running process. The file is opened without truncation so a second
//! instance that fails to get the lock cannot wipe the PID of the first.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::logger::Log;

/// Default lock file location.
pub fn lock_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("nightcolors.lock")
}

/// PID recorded in the lock file at `path`, if any.
pub fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}

/// PID of the running daemon, if there is one.
///
/// A lock file whose lock can still be taken belongs to a dead process and
/// does not count.
pub fn running_pid(path: &Path) -> Option<u32> {
    let file = OpenOptions::new().read(true).open(path).ok()?;
    if FileExt::try_lock_shared(&file).is_ok() {
        let _ = FileExt::unlock(&file);
        return None;
    }
    read_pid(path)
}

/// Held for the lifetime of the daemon. Dropping it releases the lock and
/// removes the file.
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Take the lock at `path`. Returns `Ok(None)` when another instance
    /// holds it.
    pub fn acquire(path: &Path) -> Result<Option<Self>> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            return Ok(None);
        }

        // Only now that the lock is ours may the old content go
        file.set_len(0).context("Failed to truncate lock file")?;
        writeln!(file, "{}", std::process::id()).context("Failed to write PID to lock file")?;
        file.flush()?;

        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        if let Err(e) = fs::remove_file(&self.path) {
            Log::log_warning(&format!("Failed to remove lock file: {}", e));
        } else {
            Log::log_decorated("Lock file removed successfully");
        }
    }
}
