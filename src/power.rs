//! Display power state and the "display became actionable" event.
//!
//! Colors are only written while the display is on. When a trigger arrives
//! with the display off, the pending action state machine registers a wake
//! listener here and waits for a `SCREEN_ON` trigger to come back through the
//! daemon channel.
//!
//! Listener registration is idempotent: registering twice keeps a single
//! subscription, and unregistering an absent listener does nothing. A
//! subscription delivers at most one `SCREEN_ON` and ends with it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SendError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::{ACTION_SCREEN_ON, SCREEN_POLL_INTERVAL_MS};
use crate::logger::Log;
use crate::signals::DaemonMessage;

/// Source of the actionable power state and its wake event.
pub trait PowerMonitor: Send + Sync {
    /// Whether a profile write is meaningful right now.
    fn is_actionable(&self) -> bool;

    /// Subscribe to the wake event. Returns `true` if this call created the
    /// subscription, `false` if one was already active. If the display is
    /// already actionable when the subscription is created, the event is
    /// delivered right away.
    fn register_wake_listener(&self) -> bool;

    /// Drop the subscription. No-op when none is active.
    fn unregister_wake_listener(&self);

    fn is_listener_registered(&self) -> bool;
}

/// Interpret the contents of a screen state file.
///
/// Framebuffer `blank` reads `0` when unblanked; DRM `dpms` and backlight
/// style files read `On`/`on`. Empty content carries no state and counts as
/// on. Anything else means the screen is off.
pub fn parse_screen_state(content: &str) -> bool {
    matches!(content.trim(), "" | "0" | "on" | "On" | "ON")
}

/// Reads the screen state from a sysfs file and watches it for wake edges.
pub struct SysfsPowerMonitor {
    state_path: PathBuf,
    poll_interval: Duration,
    sender: Sender<DaemonMessage>,
    registered: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl SysfsPowerMonitor {
    pub fn new(state_path: PathBuf, sender: Sender<DaemonMessage>) -> Self {
        Self::with_poll_interval(
            state_path,
            sender,
            Duration::from_millis(SCREEN_POLL_INTERVAL_MS),
        )
    }

    pub fn with_poll_interval(
        state_path: PathBuf,
        sender: Sender<DaemonMessage>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            state_path,
            poll_interval,
            sender,
            registered: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(true)),
            watcher: Mutex::new(None),
        }
    }

    /// Stop the watcher thread if it was started.
    pub fn stop(&self) {
        self.registered.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);

        let handle = self
            .watcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Start the watcher thread on first registration.
    fn ensure_watcher(&self) {
        let mut watcher = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        if watcher.is_some() || !self.running.load(Ordering::SeqCst) {
            return;
        }

        let state_path = self.state_path.clone();
        let poll_interval = self.poll_interval;
        let sender = self.sender.clone();
        let registered = self.registered.clone();
        let running = self.running.clone();

        *watcher = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(poll_interval);

                if registered.load(Ordering::SeqCst)
                    && notify_if_on(&state_path, &registered, &sender).is_err()
                {
                    break;
                }
            }
        }));
    }
}

/// Missing or unreadable state files count as "on" so hardware without one
/// never defers forever.
fn read_screen_state(path: &Path) -> bool {
    match fs::read_to_string(path) {
        Ok(content) => parse_screen_state(&content),
        Err(_) => true,
    }
}

/// Send `SCREEN_ON` if the screen is on and the subscription is still open.
///
/// The subscription is claimed before sending, so the registering thread and
/// the watcher never both deliver the same wake.
fn notify_if_on(
    state_path: &Path,
    registered: &AtomicBool,
    sender: &Sender<DaemonMessage>,
) -> Result<(), SendError<DaemonMessage>> {
    if !read_screen_state(state_path) {
        return Ok(());
    }
    if registered
        .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    Log::log_debug("Screen is on, notifying dispatcher");
    sender.send(DaemonMessage::Trigger(ACTION_SCREEN_ON.to_string()))
}

impl PowerMonitor for SysfsPowerMonitor {
    fn is_actionable(&self) -> bool {
        read_screen_state(&self.state_path)
    }

    fn register_wake_listener(&self) -> bool {
        let newly = !self.registered.swap(true, Ordering::SeqCst);
        if newly {
            self.ensure_watcher();
            // The screen may have come on after the caller last looked
            if notify_if_on(&self.state_path, &self.registered, &self.sender).is_err() {
                Log::log_warning("Daemon channel closed, wake event dropped");
            }
        }
        newly
    }

    fn unregister_wake_listener(&self) {
        self.registered.store(false, Ordering::SeqCst);
    }

    fn is_listener_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }
}

impl Drop for SysfsPowerMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
