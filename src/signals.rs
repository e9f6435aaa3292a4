//! Signal handling and the daemon's message channel.
//!
//! Every event source (POSIX signals, the alarm thread, the screen watcher)
//! talks to the main loop through one `mpsc` channel of `DaemonMessage`s, so
//! the main loop is the only place that runs a dispatch cycle.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::{Receiver, Sender},
    thread,
};

use crate::logger::Log;

/// Message delivered to the daemon main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonMessage {
    /// A trigger identifier to route (alarm fire, screen on, ...).
    Trigger(String),
    /// Configuration changed; re-read it and reinstall alarms (SIGUSR2).
    Reload,
    /// Stop the daemon (SIGTERM, SIGINT, SIGHUP).
    Shutdown,
}

/// Signal handling state shared between threads.
pub struct SignalState {
    /// Cleared when the application should stop.
    pub running: Arc<AtomicBool>,
    /// Sender handed to the alarm thread and the screen watcher.
    pub sender: Sender<DaemonMessage>,
    pub receiver: Receiver<DaemonMessage>,
}

/// Install signal handlers and spawn the thread that forwards them.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));
    let (sender, receiver) = std::sync::mpsc::channel::<DaemonMessage>();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running_clone = running.clone();
    let sender_clone = sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGUSR2 => {
                    Log::log_pipe();
                    Log::log_decorated("Received configuration reload signal");

                    if sender_clone.send(DaemonMessage::Reload).is_err() {
                        // Receiver dropped, the main loop is exiting
                        break;
                    }
                }
                _ => {
                    let user_message = match sig {
                        SIGINT if debug_enabled => {
                            "Received SIGINT (Ctrl+C), initiating graceful shutdown..."
                        }
                        SIGINT => "Received interrupt signal, initiating graceful shutdown...",
                        SIGTERM => "Received termination request, initiating graceful shutdown...",
                        SIGHUP => "Received hangup signal, initiating graceful shutdown...",
                        _ => "Received shutdown signal, initiating graceful shutdown...",
                    };

                    Log::log_pipe();
                    Log::log_decorated(user_message);

                    if let Err(e) = sender_clone.send(DaemonMessage::Shutdown) {
                        Log::log_warning(&format!("Failed to send shutdown message: {}", e));
                    }

                    running_clone.store(false, Ordering::SeqCst);
                }
            }
        }
    });

    Ok(SignalState {
        running,
        sender,
        receiver,
    })
}
