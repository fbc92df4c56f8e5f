//! Configuration management (config.toml)
//!
//! Handles loading, saving, and providing defaults for launcher settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the config file inside [`config_dir`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default metadata search endpoint (RAWG games search).
pub const DEFAULT_RAWG_API_URL: &str = "https://api.rawg.io/api/games";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no config directory available on this platform")]
    NoConfigDir,
}

/// Launcher configuration.
///
/// Every field has a default so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding cached cover images
    pub covers_dir: PathBuf,
    /// Root of the `<console>/<rom>` tree scanned when no catalog file exists
    pub roms_dir: PathBuf,
    /// Declared catalog (JSON array of game entries)
    pub games_file: PathBuf,
    /// Directory scanned for emulator executables
    pub emulators_dir: PathBuf,
    /// RAWG API key; empty disables the metadata fallback
    pub rawg_api_key: String,
    /// RAWG games search endpoint
    pub rawg_api_url: String,
    /// Timeout for a single cover download, in seconds
    pub fetch_timeout_secs: u64,
    /// Timeout for a metadata search request, in seconds
    pub api_timeout_secs: u64,
    /// Console name -> emulator executable
    pub emulators: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            covers_dir: PathBuf::from("resources/covers"),
            roms_dir: PathBuf::from("roms"),
            games_file: PathBuf::from("data/games.json"),
            emulators_dir: PathBuf::from("emulators"),
            rawg_api_key: String::new(),
            rawg_api_url: DEFAULT_RAWG_API_URL.to_string(),
            fetch_timeout_secs: 10,
            api_timeout_secs: 8,
            emulators: default_emulators(),
        }
    }
}

fn default_emulators() -> BTreeMap<String, PathBuf> {
    [
        ("NES", "emulators/nestopia.exe"),
        ("SNES", "emulators/snes9x.exe"),
        ("GBA", "emulators/visualboyadvance.exe"),
    ]
    .into_iter()
    .map(|(console, path)| (console.to_string(), PathBuf::from(path)))
    .collect()
}

impl Config {
    /// The trimmed API key, or `None` when the metadata fallback is disabled.
    pub fn api_key(&self) -> Option<&str> {
        let key = self.rawg_api_key.trim();
        (!key.is_empty()).then_some(key)
    }

    /// Configured emulator path for a console, if any.
    pub fn emulator_for(&self, console: &str) -> Option<&Path> {
        self.emulators.get(console).map(PathBuf::as_path)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs.max(1))
    }

    /// Render as the TOML written by [`save_to`].
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Retroshelf\config`
/// On macOS: `~/Library/Application Support/io.retroshelf.Retroshelf`
/// On Linux: `~/.config/retroshelf`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.retroshelf", "", "Retroshelf")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Full path of the default config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from the platform config directory.
///
/// A missing file is created with defaults (best effort). An unreadable or
/// unparsable file falls back to defaults.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("No config directory available, using defaults");
        return Config::default();
    };

    if !path.exists() {
        let config = Config::default();
        if let Err(e) = save_to(&config, &path) {
            tracing::warn!("Failed to write default config: {}", e);
        }
        return config;
    }

    load_from(&path).unwrap_or_else(|e| {
        tracing::warn!("{}. Using default configuration.", e);
        Config::default()
    })
}

/// Loads the configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Saves the configuration to the platform config directory.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Saves the configuration to an explicit path, creating parent directories.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    let content = config.to_toml()?;
    std::fs::write(path, content).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.covers_dir, PathBuf::from("resources/covers"));
        assert_eq!(config.emulators_dir, PathBuf::from("emulators"));
        assert_eq!(config.fetch_timeout_secs, 10);
        assert_eq!(config.rawg_api_url, DEFAULT_RAWG_API_URL);
        assert_eq!(
            config.emulator_for("NES"),
            Some(Path::new("emulators/nestopia.exe"))
        );
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_api_key_trimmed() {
        let config = Config {
            rawg_api_key: "  abc123 \n".to_string(),
            ..Config::default()
        };
        assert_eq!(config.api_key(), Some("abc123"));

        let blank = Config {
            rawg_api_key: "   ".to_string(),
            ..Config::default()
        };
        assert!(blank.api_key().is_none());
    }

    #[test]
    fn test_timeouts_never_zero() {
        let config = Config {
            fetch_timeout_secs: 0,
            api_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.fetch_timeout(), Duration::from_secs(1));
        assert_eq!(config.api_timeout(), Duration::from_secs(1));
    }

    // =============================================================
    // TOML tests
    // =============================================================

    #[test]
    fn test_config_deserialize_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml_str = r#"
covers_dir = "/tmp/covers"
rawg_api_key = "k"

[emulators]
GB = "/opt/emu/sameboy"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.covers_dir, PathBuf::from("/tmp/covers"));
        assert_eq!(config.api_key(), Some("k"));
        assert_eq!(config.emulator_for("GB"), Some(Path::new("/opt/emu/sameboy")));
        // Table replaces the defaults entirely
        assert!(config.emulator_for("NES").is_none());
        assert_eq!(config.roms_dir, PathBuf::from("roms"));
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        config.rawg_api_key = "secret".to_string();
        config
            .emulators
            .insert("N64".to_string(), PathBuf::from("/usr/bin/mupen64plus"));

        save_to(&config, &path).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_from(&temp_dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "covers_dir = [not toml").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("invalid config"));
    }
}
