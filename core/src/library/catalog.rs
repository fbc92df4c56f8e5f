//! Catalog loading
//!
//! Games come from a declared JSON catalog when one exists, otherwise from a
//! scan of `<roms_dir>/<console>/<rom file>`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::Game;
use crate::config::Config;

/// ROM extensions recognised by the directory scan (lowercase, no dot).
pub const SUPPORTED_ROM_EXTENSIONS: &[&str] = &["nes", "smc", "sfc", "gba", "gbc", "gb"];

/// Raw catalog entry. Only `console` and `rom_path` are required.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    key: Option<String>,
    name: Option<String>,
    console: Option<String>,
    rom_path: Option<PathBuf>,
    image_url: Option<String>,
}

/// Loads the full game list for a configuration.
///
/// The declared catalog wins; the ROM directory scan only runs when the
/// catalog is missing, unreadable or empty.
pub fn load_catalog(config: &Config) -> Vec<Game> {
    let mut games = if config.games_file.exists() {
        load_games_file(&config.games_file)
    } else {
        Vec::new()
    };

    if games.is_empty() {
        games = scan_roms_dir(&config.roms_dir);
    }

    tracing::info!("Loaded {} games", games.len());
    games
}

/// Parses a JSON catalog file.
///
/// Invalid entries are skipped with a warning; a file that cannot be read or
/// parsed yields an empty list.
pub fn load_games_file(path: &Path) -> Vec<Game> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!("Error loading {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let entries: Vec<CatalogEntry> = match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Error parsing {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    entries.into_iter().filter_map(entry_to_game).collect()
}

fn entry_to_game(entry: CatalogEntry) -> Option<Game> {
    let (Some(console), Some(rom_path)) = (entry.console, entry.rom_path) else {
        tracing::warn!(
            "Skipping catalog entry {:?}: missing console or rom_path",
            entry.name.as_deref().unwrap_or("<unnamed>")
        );
        return None;
    };
    if console.is_empty() || rom_path.as_os_str().is_empty() {
        tracing::warn!("Skipping catalog entry with empty console or rom_path");
        return None;
    }

    let name = entry.name.unwrap_or_else(|| "Unknown".to_string());
    let key = entry
        .key
        .unwrap_or_else(|| Game::make_key(&console, &name));

    Some(Game {
        key,
        name,
        console,
        rom_path: absolutize(rom_path),
        image_url: entry.image_url,
    })
}

/// Scans `<roms_dir>/<console>/` for ROM files.
///
/// Console directories and their files are visited in sorted order so the
/// resulting list is stable between runs.
pub fn scan_roms_dir(roms_dir: &Path) -> Vec<Game> {
    if !roms_dir.is_dir() {
        tracing::warn!("No ROMs directory found: {}", roms_dir.display());
        return Vec::new();
    }

    sorted_entries(roms_dir)
        .into_iter()
        .filter(|path| path.is_dir())
        .flat_map(|console_dir| {
            let console = console_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            sorted_entries(&console_dir)
                .into_iter()
                .filter(|path| path.is_file() && is_supported_rom(path))
                .filter_map(move |path| {
                    let name = path.file_stem()?.to_string_lossy().into_owned();
                    Some(Game::new(console.clone(), name, absolutize(path)))
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    paths
}

fn is_supported_rom(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_ROM_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}
