//! Game record shared by the catalog, cover fetcher and launcher.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A game known to the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Unique identifier (`console::name`), used as the cover cache key
    pub key: String,
    /// Display name, also the metadata search query
    pub name: String,
    /// Target system, drives emulator resolution
    pub console: String,
    /// Absolute path to the ROM file
    pub rom_path: PathBuf,
    /// Direct cover art URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Game {
    /// Builds a game with the conventional `console::name` key.
    pub fn new(
        console: impl Into<String>,
        name: impl Into<String>,
        rom_path: impl Into<PathBuf>,
    ) -> Self {
        let console = console.into();
        let name = name.into();
        Self {
            key: Self::make_key(&console, &name),
            name,
            console,
            rom_path: rom_path.into(),
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn make_key(console: &str, name: &str) -> String {
        format!("{}::{}", console, name)
    }

    /// Cover URL if one is set and non-blank.
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}
