//! Emulator process launching and exit supervision.
//!
//! [`ProcessSupervisor::launch`] validates paths, spawns the emulator with the
//! ROM as its only argument and returns at once. A detached watcher thread
//! waits for the process and reports exactly one [`ProcessExit`].

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::thread;

use thiserror::Error;

use crate::events::{EventSender, ExitOutcome, LauncherEvent, ProcessExit};

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("emulator not found: {}", .0.display())]
    MissingExecutable(PathBuf),
    #[error("ROM file not found: {}", .0.display())]
    MissingRom(PathBuf),
    #[error("failed to launch {}: {source}", path.display())]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A running emulator. Dropping the handle does not stop the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchHandle {
    pid: u32,
    tag: String,
    emulator: PathBuf,
    rom: PathBuf,
}

impl LaunchHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Tag carried by this launch's exit event.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn emulator(&self) -> &Path {
        &self.emulator
    }

    pub fn rom(&self) -> &Path {
        &self.rom
    }
}

/// Launches emulators and publishes `ProcessExited` events.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    events: EventSender,
}

impl ProcessSupervisor {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }

    /// Launch `emulator rom`, tagging the exit event with the ROM path.
    pub fn launch(&self, emulator: &Path, rom: &Path) -> Result<LaunchHandle, LaunchError> {
        self.launch_tagged(&rom.display().to_string(), emulator, rom)
    }

    /// Launch `emulator rom`, tagging the exit event with `tag` (e.g. a game key).
    pub fn launch_tagged(
        &self,
        tag: &str,
        emulator: &Path,
        rom: &Path,
    ) -> Result<LaunchHandle, LaunchError> {
        let events = self.events.clone();
        launch_with(tag, emulator, rom, move |exit| {
            events.send(LauncherEvent::ProcessExited(exit));
        })
    }
}

/// Launch with an explicit exit callback instead of the event channel.
///
/// `on_exit` runs exactly once, on the watcher thread, after the process ends.
/// Precondition and spawn failures return an error and never call it.
pub fn launch_with<F>(
    tag: &str,
    emulator: &Path,
    rom: &Path,
    on_exit: F,
) -> Result<LaunchHandle, LaunchError>
where
    F: FnOnce(ProcessExit) + Send + 'static,
{
    if !emulator.exists() {
        tracing::error!("Emulator missing: {}", emulator.display());
        return Err(LaunchError::MissingExecutable(emulator.to_path_buf()));
    }
    if !rom.exists() {
        tracing::error!("ROM missing: {}", rom.display());
        return Err(LaunchError::MissingRom(rom.to_path_buf()));
    }

    let mut cmd = Command::new(emulator);
    cmd.arg(rom);

    tracing::info!("Launching emulator: {:?}", cmd);

    let child = cmd.spawn().map_err(|source| {
        tracing::error!("Launch error for {}: {}", emulator.display(), source);
        LaunchError::SpawnFailed {
            path: emulator.to_path_buf(),
            source,
        }
    })?;

    let handle = LaunchHandle {
        pid: child.id(),
        tag: tag.to_string(),
        emulator: emulator.to_path_buf(),
        rom: rom.to_path_buf(),
    };

    let tag = handle.tag.clone();
    thread::spawn(move || watch(child, tag, on_exit));

    Ok(handle)
}

fn watch<F>(mut child: Child, tag: String, on_exit: F)
where
    F: FnOnce(ProcessExit),
{
    let pid = child.id();
    let outcome = match child.wait() {
        Ok(status) => {
            let outcome = exit_outcome(status);
            match &outcome {
                ExitOutcome::Code(code) => {
                    tracing::info!("Emulator {} ({}) exited with code {}", pid, tag, code)
                }
                ExitOutcome::Signal(signal) => {
                    tracing::info!("Emulator {} ({}) terminated by signal {}", pid, tag, signal)
                }
                ExitOutcome::WaitFailed(reason) => {
                    tracing::error!("Emulator {} ({}) ended without status: {}", pid, tag, reason)
                }
            }
            outcome
        }
        Err(e) => {
            tracing::error!("Failed to wait on emulator {} ({}): {}", pid, tag, e);
            ExitOutcome::WaitFailed(e.to_string())
        }
    };

    on_exit(ProcessExit { tag, pid, outcome });
}

fn exit_outcome(status: ExitStatus) -> ExitOutcome {
    if let Some(code) = status.code() {
        return ExitOutcome::Code(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitOutcome::Signal(signal);
        }
    }
    ExitOutcome::WaitFailed(format!("no exit code or signal in {}", status))
}
