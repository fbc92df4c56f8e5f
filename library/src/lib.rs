//! Retroshelf front-end
//!
//! Ties the core components together the way the poster-grid UI uses them.
//! Emulators run as separate processes, so a crashing emulator never takes
//! the launcher down with it.

pub mod launcher;

pub use launcher::{GameLauncher, PlayError};
