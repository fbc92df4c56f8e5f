//! Retroshelf Core - launcher engine behind the poster grid
//!
//! This crate holds everything the launcher UI calls into. The UI itself
//! only issues requests and reacts to [`LauncherEvent`]s.
//!
//! # Architecture
//!
//! - [`CoverFetcher`] - asynchronous, cached cover art downloads
//! - [`emulator::resolve`] - locates the emulator for a console
//! - [`ProcessSupervisor`] - launches emulators and reports their exit
//! - [`library`] - game records, catalog loading and query resolution
//! - [`config`] - persisted launcher settings

pub mod config;
pub mod cover;
pub mod emulator;
pub mod events;
pub mod library;
pub mod process;
#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use cover::{CacheError, CoverCache, CoverFetcher};
pub use emulator::{EmulatorSource, ResolvedEmulator};
pub use events::{
    EventReceiver, EventSender, ExitOutcome, FetchResult, LauncherEvent, ProcessExit, channel,
};
pub use library::Game;
pub use process::{LaunchError, LaunchHandle, ProcessSupervisor, launch_with};
