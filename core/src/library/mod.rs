//! Game library
//!
//! The game record handed to the cover and launch subsystems, plus the
//! collaborators that produce it: catalog loading and query resolution.

mod catalog;
mod game;
mod resolver;

pub use catalog::{SUPPORTED_ROM_EXTENSIONS, load_catalog, load_games_file, scan_roms_dir};
pub use game::Game;
pub use resolver::{ResolutionError, levenshtein_distance, resolve_game};
