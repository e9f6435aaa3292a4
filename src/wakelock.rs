//! Reference-counted wake lock shared by every dispatch cycle.
//!
//! Overlapping dispatches share one system lock: the first acquisition takes
//! it, the last release drops it. Acquiring returns a guard, so the count is
//! decremented on every exit path of the guarded work, including unwinding.
//!
//! The system lock is created lazily on first use. Creation, the counter and
//! the system acquire/release calls all happen under the same mutex.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Config;
use crate::constants::{KERNEL_WAKE_LOCK_PATH, KERNEL_WAKE_UNLOCK_PATH};
use crate::logger::Log;

/// A platform mechanism that keeps the host from suspending.
pub trait SystemWakeLock: Send {
    fn acquire(&mut self) -> io::Result<()>;
    fn release(&mut self) -> io::Result<()>;
}

/// Kernel wakelock interface (`/sys/power/wake_lock`).
///
/// Writing a name to `wake_lock` takes a named lock; writing the same name to
/// `wake_unlock` drops it.
#[derive(Debug, Clone)]
pub struct KernelWakeLock {
    name: String,
    lock_path: PathBuf,
    unlock_path: PathBuf,
}

impl KernelWakeLock {
    pub fn new(name: String) -> Self {
        Self::with_paths(
            name,
            PathBuf::from(KERNEL_WAKE_LOCK_PATH),
            PathBuf::from(KERNEL_WAKE_UNLOCK_PATH),
        )
    }

    pub fn with_paths(name: String, lock_path: PathBuf, unlock_path: PathBuf) -> Self {
        Self {
            name,
            lock_path,
            unlock_path,
        }
    }

    fn write_name(&self, path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).open(path)?;
        file.write_all(self.name.as_bytes())
    }
}

impl SystemWakeLock for KernelWakeLock {
    fn acquire(&mut self) -> io::Result<()> {
        self.write_name(&self.lock_path)
    }

    fn release(&mut self) -> io::Result<()> {
        self.write_name(&self.unlock_path)
    }
}

/// Used where the kernel interface does not exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWakeLock;

impl SystemWakeLock for NoopWakeLock {
    fn acquire(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        Ok(())
    }
}

type WakeLockFactory = Box<dyn Fn() -> Box<dyn SystemWakeLock> + Send + Sync>;

struct WakeLockState {
    ref_count: usize,
    system: Option<Box<dyn SystemWakeLock>>,
}

/// The shared, reference-counted wake lock.
pub struct WakeLock {
    state: Mutex<WakeLockState>,
    factory: WakeLockFactory,
}

impl WakeLock {
    /// `factory` is called once, on the first acquisition.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn SystemWakeLock> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(WakeLockState {
                ref_count: 0,
                system: None,
            }),
            factory: Box::new(factory),
        }
    }

    /// Kernel wake lock named after `wake_lock_name`, or a no-op lock when
    /// the kernel interface is missing.
    pub fn for_config(config: &Config) -> Self {
        let name = config.wake_lock_name();
        Self::new(move || -> Box<dyn SystemWakeLock> {
            if Path::new(KERNEL_WAKE_LOCK_PATH).exists() {
                Box::new(KernelWakeLock::new(name.clone()))
            } else {
                Log::log_debug("Kernel wake lock interface not available, continuing without it");
                Box::new(NoopWakeLock)
            }
        })
    }

    /// Take one reference. The returned guard gives it back when dropped.
    pub fn acquire(&self) -> WakeLockGuard<'_> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if state.ref_count == 0 {
            let system = state.system.get_or_insert_with(|| (self.factory)());
            if let Err(e) = system.acquire() {
                // Keep going: losing the lock only risks a suspend mid-write
                Log::log_warning(&format!("Failed to acquire wake lock: {}", e));
            } else {
                Log::log_debug("Wake lock acquired");
            }
        }
        state.ref_count += 1;

        WakeLockGuard { lock: self }
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if state.ref_count == 0 {
            return;
        }
        state.ref_count -= 1;

        if state.ref_count == 0 {
            if let Some(system) = state.system.as_mut() {
                match system.release() {
                    Ok(()) => Log::log_debug("Wake lock released"),
                    Err(e) => Log::log_warning(&format!("Failed to release wake lock: {}", e)),
                }
            }
        }
    }

    /// Number of outstanding acquisitions.
    pub fn ref_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).ref_count
    }

    pub fn is_held(&self) -> bool {
        self.ref_count() > 0
    }

    /// Run `f` while holding a reference.
    ///
    /// The reference is released when `f` returns, whatever it returns, and
    /// when it panics.
    pub fn with_wake_lock<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.acquire();
        f()
    }
}

/// One outstanding acquisition of a [`WakeLock`].
#[must_use = "the wake lock is released as soon as the guard is dropped"]
pub struct WakeLockGuard<'a> {
    lock: &'a WakeLock,
}

impl Drop for WakeLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
