//! Emulator lookup for a console.
//!
//! Searches in order, first hit wins:
//! 1. The path configured for the console, if it exists
//! 2. A file in the emulators directory whose name contains the console name
//!    (case-insensitive), in sorted order
//! 3. The only executable in the emulators directory, whatever its name
//!
//! Step 3 can pick an emulator for the wrong console and always logs a warning.

use std::path::{Path, PathBuf};

use crate::config::Config;

/// Extensions treated as executables by the single-emulator fallback.
pub const EXECUTABLE_EXTENSIONS: &[&str] = &["exe"];

/// Where a resolved emulator came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulatorSource {
    /// `emulators.<console>` in the config
    Configured,
    /// Filename in the emulators directory matched the console
    DirectoryMatch,
    /// Only executable in the emulators directory
    SoleExecutable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEmulator {
    pub path: PathBuf,
    pub source: EmulatorSource,
}

/// Locate the emulator for `console`. `None` means nothing suitable exists.
pub fn resolve(config: &Config, console: &str) -> Option<PathBuf> {
    resolve_detailed(config, console).map(|resolved| resolved.path)
}

/// Like [`resolve`], also reporting which search step matched.
pub fn resolve_detailed(config: &Config, console: &str) -> Option<ResolvedEmulator> {
    if let Some(path) = config.emulator_for(console) {
        if path.exists() {
            tracing::info!("Using configured emulator for {}: {}", console, path.display());
            return Some(ResolvedEmulator {
                path: path.to_path_buf(),
                source: EmulatorSource::Configured,
            });
        }
        tracing::debug!(
            "Configured emulator for {} not found: {}",
            console,
            path.display()
        );
    }

    let files = emulator_files(&config.emulators_dir);

    let needle = console.to_lowercase();
    if !needle.is_empty()
        && let Some(path) = files.iter().find(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    {
        tracing::info!("Found emulator for {} in {}", console, path.display());
        return Some(ResolvedEmulator {
            path: path.clone(),
            source: EmulatorSource::DirectoryMatch,
        });
    }

    let executables: Vec<&PathBuf> = files.iter().filter(|path| is_executable_name(path)).collect();
    if let [only] = executables.as_slice() {
        tracing::warn!(
            "No emulator matches console {}; falling back to the only executable {}",
            console,
            only.display()
        );
        return Some(ResolvedEmulator {
            path: (*only).clone(),
            source: EmulatorSource::SoleExecutable,
        });
    }

    tracing::debug!("No emulator found for {}", console);
    None
}

/// Regular files directly inside `dir`, sorted. Missing dir yields nothing.
fn emulator_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

fn is_executable_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            EXECUTABLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
