//! Cover cache directory.
//!
//! The only persisted state is the presence of `<covers_dir>/<sanitized key>.png`.
//! Entries are created by the worker, never modified and never evicted.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to create cover directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to start cover download runtime: {0}")]
    Runtime(std::io::Error),
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// Maps game keys to cover files under a single directory.
#[derive(Debug, Clone)]
pub struct CoverCache {
    dir: PathBuf,
}

impl CoverCache {
    /// Open (and create if needed) the cache directory.
    ///
    /// Failure here is a configuration error; no fetch can run without it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cover path for a key. Pure: the same key always maps to the same path.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.png", sanitize_key(key)))
    }

    /// Whether a cover is already cached for this key.
    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// The cached path, if present.
    pub fn lookup(&self, key: &str) -> Option<PathBuf> {
        let path = self.path_for(key);
        path.is_file().then_some(path)
    }
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// Distinct keys may collide (`NES::A` and `NES__A` both become `NES__A`).
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Temp file a download streams into before the rename.
pub(crate) fn temp_path_for(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
