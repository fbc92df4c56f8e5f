//! Single cover download.
//!
//! One call of [`fetch_cover`] tries, in order:
//! 1. The direct image URL, if the game has one
//! 2. A RAWG search for the game name (only with an API key), then the
//!    `background_image` of the best match
//!
//! Bodies are streamed into `<dest>.tmp` and renamed into place, so a reader
//! never sees a partial cover.

use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use super::cache::temp_path_for;
use crate::config::Config;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("empty response body")]
    EmptyBody,
    #[error("no search result with a background image")]
    NoApiMatch,
    #[error("no image URL and metadata search disabled")]
    ApiDisabled,
}

/// Network settings shared by every download.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// RAWG API key; `None` disables the search fallback
    pub api_key: Option<String>,
    /// RAWG games search endpoint
    pub api_url: String,
    pub download_timeout: Duration,
    pub api_timeout: Duration,
}

impl FetchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.api_key().map(str::to_string),
            api_url: config.rawg_api_url.clone(),
            download_timeout: config.fetch_timeout(),
            api_timeout: config.api_timeout(),
        }
    }
}

/// RAWG search response (only the fields we read)
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    background_image: Option<String>,
}

/// Produce a cover at `dest` for one game.
///
/// Every failure is returned, never panicked; the caller turns it into a
/// "no cover" result.
pub async fn fetch_cover(
    client: &reqwest::Client,
    settings: &FetchSettings,
    name: &str,
    url: Option<&str>,
    dest: &Path,
) -> Result<(), FetchError> {
    let mut last_error = FetchError::ApiDisabled;

    if let Some(url) = url {
        match download(client, url, dest, settings.download_timeout).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!("Image download failed from {}: {}", url, e);
                last_error = e;
            }
        }
    }

    let Some(api_key) = settings.api_key.as_deref() else {
        return Err(last_error);
    };

    tracing::debug!("Searching RAWG for cover of {:?}", name);
    let image_url = search_background_image(client, settings, api_key, name)
        .await
        .inspect_err(|e| tracing::warn!("RAWG fetch error for {}: {}", name, e))?;

    download(client, &image_url, dest, settings.download_timeout)
        .await
        .inspect_err(|e| tracing::warn!("Image download failed from {}: {}", image_url, e))
}

/// GET `url` into `dest` via a temp file and an atomic rename.
async fn download(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<(), FetchError> {
    let response = client.get(url).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let tmp = temp_path_for(dest);
    let written = match stream_to_file(response, &tmp).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
    };

    if written == 0 {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(FetchError::EmptyBody);
    }

    if let Err(e) = tokio::fs::rename(&tmp, dest).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    tracing::debug!("Saved cover {} ({} bytes)", dest.display(), written);
    Ok(())
}

async fn stream_to_file(mut response: reqwest::Response, path: &Path) -> Result<u64, FetchError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Ask the search API for the best match and return its background image.
async fn search_background_image(
    client: &reqwest::Client,
    settings: &FetchSettings,
    api_key: &str,
    name: &str,
) -> Result<String, FetchError> {
    let response = client
        .get(&settings.api_url)
        .query(&[("search", name), ("page_size", "1"), ("key", api_key)])
        .timeout(settings.api_timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let body: SearchResponse = response.json().await?;
    body.results
        .into_iter()
        .next()
        .and_then(|result| result.background_image)
        .filter(|url| !url.is_empty())
        .ok_or(FetchError::NoApiMatch)
}
