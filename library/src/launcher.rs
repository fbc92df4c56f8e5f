//! Play a game: resolve its emulator, then launch under supervision.

use retroshelf_core::emulator::{self, ResolvedEmulator};
use retroshelf_core::{Config, EventSender, Game, LaunchError, LaunchHandle, ProcessSupervisor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayError {
    #[error("no emulator configured for console '{0}'")]
    EmulatorNotFound(String),
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// Launches games from the catalog. Exit events carry the game key as tag.
#[derive(Debug, Clone)]
pub struct GameLauncher {
    config: Config,
    supervisor: ProcessSupervisor,
}

impl GameLauncher {
    pub fn new(config: Config, events: EventSender) -> Self {
        Self {
            config,
            supervisor: ProcessSupervisor::new(events),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The emulator that [`GameLauncher::play`] would use for a console.
    pub fn emulator_for(&self, console: &str) -> Option<ResolvedEmulator> {
        emulator::resolve_detailed(&self.config, console)
    }

    /// Launch a game and return immediately.
    ///
    /// With no emulator for the console nothing is spawned.
    pub fn play(&self, game: &Game) -> Result<LaunchHandle, PlayError> {
        let resolved = self
            .emulator_for(&game.console)
            .ok_or_else(|| PlayError::EmulatorNotFound(game.console.clone()))?;

        tracing::info!(
            "Playing '{}' ({}) with {}",
            game.name,
            game.console,
            resolved.path.display()
        );

        let handle = self
            .supervisor
            .launch_tagged(&game.key, &resolved.path, &game.rom_path)?;
        Ok(handle)
    }
}
