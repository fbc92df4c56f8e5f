//! Asynchronous notifications from the core to the presentation layer.
//!
//! Background tasks (cover downloads, emulator watchers) publish
//! [`LauncherEvent`]s on a channel. The UI thread drains it once per frame
//! with [`EventReceiver::poll`]; command-line callers block with
//! [`EventReceiver::recv_timeout`].

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Outcome of one cover request. `path == None` means no cover is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub key: String,
    pub path: Option<PathBuf>,
}

impl FetchResult {
    pub fn ready(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: Some(path.into()),
        }
    }

    pub fn failed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.path.is_some()
    }
}

/// How a supervised process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with a status code
    Code(i32),
    /// Killed by the given signal (Unix only)
    Signal(i32),
    /// Waiting on the child failed
    WaitFailed(String),
}

/// Exit notification for a launched emulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// Caller-supplied tag (the game key when launched for a game)
    pub tag: String,
    pub pid: u32,
    pub outcome: ExitOutcome,
}

impl ProcessExit {
    /// The exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        match self.outcome {
            ExitOutcome::Code(code) => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherEvent {
    /// A cover request finished (successfully or not)
    ImageReady(FetchResult),
    /// A launched emulator exited
    ProcessExited(ProcessExit),
}

/// Publishing half, cloned into every background task.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<LauncherEvent>,
}

impl EventSender {
    /// Publish an event. A dropped receiver is logged, not an error.
    pub fn send(&self, event: LauncherEvent) {
        if let Err(mpsc::SendError(event)) = self.tx.send(event) {
            tracing::debug!("Event receiver gone, dropping {:?}", event);
        }
    }
}

/// Subscribing half, owned by the presentation layer.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<LauncherEvent>,
}

impl EventReceiver {
    /// Non-blocking: next pending event, if any.
    pub fn poll(&self) -> Option<LauncherEvent> {
        self.rx.try_recv().ok()
    }

    /// Block until an event arrives. `None` once every sender is gone.
    pub fn recv(&self) -> Option<LauncherEvent> {
        self.rx.recv().ok()
    }

    /// Block until an event arrives or the timeout elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LauncherEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// All events pending right now.
    pub fn drain(&self) -> impl Iterator<Item = LauncherEvent> + '_ {
        self.rx.try_iter()
    }
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}
