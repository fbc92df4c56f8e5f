//! Cover request coordinator.
//!
//! [`CoverFetcher::request`] never blocks the caller: cache hits are answered
//! synchronously, misses are downloaded on the fetcher's own runtime and
//! answered through the event channel.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;

use super::cache::{CacheError, CoverCache};
use super::worker::{FetchSettings, fetch_cover};
use crate::config::Config;
use crate::events::{EventSender, FetchResult, LauncherEvent};
use crate::library::Game;

/// Waiting request keys per cover file with a download in progress.
///
/// Keyed by destination path, not request key: keys that sanitize to the
/// same file share one download and one `.tmp` writer.
type InFlight = Arc<Mutex<HashMap<PathBuf, Vec<String>>>>;

/// Dispatches cover downloads and publishes one `ImageReady` per request.
///
/// Requests whose cover file is already downloading (same key, or a key that
/// sanitizes to the same file name) are coalesced onto the running download;
/// each coalesced request still gets its own result.
///
/// Must be created and dropped outside of an async context (it owns a tokio
/// runtime). Dropping it aborts downloads that have not finished.
pub struct CoverFetcher {
    cache: CoverCache,
    settings: Arc<FetchSettings>,
    client: reqwest::Client,
    events: EventSender,
    in_flight: InFlight,
    runtime: tokio::runtime::Runtime,
}

impl CoverFetcher {
    /// Open the cover cache and start the download runtime.
    pub fn new(config: &Config, events: EventSender) -> Result<Self, CacheError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(CacheError::Client)?;
        Self::with_client(config, events, client)
    }

    /// Like [`CoverFetcher::new`] with a caller-configured HTTP client.
    pub fn with_client(
        config: &Config,
        events: EventSender,
        client: reqwest::Client,
    ) -> Result<Self, CacheError> {
        let cache = CoverCache::open(&config.covers_dir)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("cover-fetch")
            .build()
            .map_err(CacheError::Runtime)?;

        Ok(Self {
            cache,
            settings: Arc::new(FetchSettings::from_config(config)),
            client,
            events,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            runtime,
        })
    }

    pub fn cache(&self) -> &CoverCache {
        &self.cache
    }

    /// Request the cover for one game.
    pub fn request_game(&self, game: &Game) {
        self.request(&game.key, &game.name, game.image_url());
    }

    /// Request covers for many games; results arrive in any order.
    pub fn request_all<'a>(&self, games: impl IntoIterator<Item = &'a Game>) {
        for game in games {
            self.request_game(game);
        }
    }

    /// Request a cover. Exactly one `ImageReady` event follows for this call.
    pub fn request(&self, key: &str, name: &str, url: Option<&str>) {
        if let Some(path) = self.cache.lookup(key) {
            tracing::debug!("Cover cache hit for {}", key);
            self.events
                .send(LauncherEvent::ImageReady(FetchResult::ready(key, path)));
            return;
        }

        let dest = self.cache.path_for(key);
        {
            let mut in_flight = lock(&self.in_flight);
            if let Some(waiting) = in_flight.get_mut(&dest) {
                waiting.push(key.to_string());
                tracing::debug!(
                    "Cover {} already downloading ({} waiting)",
                    dest.display(),
                    waiting.len()
                );
                return;
            }
            in_flight.insert(dest.clone(), vec![key.to_string()]);
        }

        let delivery = Delivery {
            dest: dest.clone(),
            in_flight: Arc::clone(&self.in_flight),
            events: self.events.clone(),
            done: false,
        };
        let client = self.client.clone();
        let settings = Arc::clone(&self.settings);
        let name = name.to_string();
        let url = url.map(str::to_string);

        tracing::debug!("Fetching cover for {}", key);
        self.runtime.spawn(async move {
            let mut delivery = delivery;
            let path = match fetch_cover(&client, &settings, &name, url.as_deref(), &dest).await {
                Ok(()) => Some(dest),
                Err(e) => {
                    tracing::debug!("No cover for {}: {}", name, e);
                    None
                }
            };
            delivery.complete(path);
        });
    }

    /// Number of cover files with a download in progress.
    pub fn pending(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

/// Publishes the result to every request coalesced on a cover file.
///
/// If the download task dies before completing, the drop publishes a
/// failure so no request goes unanswered.
struct Delivery {
    dest: PathBuf,
    in_flight: InFlight,
    events: EventSender,
    done: bool,
}

impl Delivery {
    fn complete(&mut self, path: Option<PathBuf>) {
        let waiting = lock(&self.in_flight)
            .remove(&self.dest)
            .unwrap_or_default();
        for key in waiting {
            self.events.send(LauncherEvent::ImageReady(FetchResult {
                key,
                path: path.clone(),
            }));
        }
        self.done = true;
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if !self.done {
            tracing::warn!("Cover task for {} ended without a result", self.dest.display());
            self.complete(None);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventReceiver, channel};
    use crate::test_utils::test_client;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(10);

    fn fetcher(
        covers_dir: PathBuf,
        api_key: &str,
        server: &MockServer,
    ) -> (CoverFetcher, EventReceiver) {
        let config = Config {
            covers_dir,
            rawg_api_key: api_key.to_string(),
            rawg_api_url: server.url("/api/games"),
            ..Config::default()
        };
        let (tx, rx) = channel();
        let fetcher = CoverFetcher::with_client(&config, tx, test_client()).unwrap();
        (fetcher, rx)
    }

    fn next_result(rx: &EventReceiver) -> FetchResult {
        match rx.recv_timeout(WAIT) {
            Some(LauncherEvent::ImageReady(result)) => result,
            other => panic!("expected ImageReady, got {:?}", other),
        }
    }

    fn cover_files(dir: &std::path::Path) -> Vec<String> {
        let mut files: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        files
    }

    // =============================================================
    // Cache
    // =============================================================

    #[test]
    fn test_open_failure_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("covers");
        std::fs::write(&blocker, b"file").unwrap();
        let config = Config {
            covers_dir: blocker,
            ..Config::default()
        };
        let (tx, _rx) = channel();
        let err = CoverFetcher::with_client(&config, tx, test_client())
            .err()
            .unwrap();
        assert!(matches!(err, CacheError::CreateDir { .. }));
    }

    #[test]
    fn test_cache_hit_is_synchronous_and_offline() {
        let server = MockServer::start();
        let cover = server.mock(|when, then| {
            when.path("/foo.png");
            then.status(200).body("DATA");
        });
        let temp_dir = TempDir::new().unwrap();
        let (fetcher, rx) = fetcher(temp_dir.path().to_path_buf(), "key", &server);
        let cached = fetcher.cache().path_for("NES::Foo");
        std::fs::write(&cached, b"cached").unwrap();

        fetcher.request("NES::Foo", "Foo", Some(&server.url("/foo.png")));

        // Delivered before request() returned
        assert_eq!(
            rx.poll(),
            Some(LauncherEvent::ImageReady(FetchResult::ready("NES::Foo", cached)))
        );
        assert_eq!(cover.hits(), 0);
    }

    #[test]
    fn test_miss_downloads_then_hits() {
        let server = MockServer::start();
        let cover = server.mock(|when, then| {
            when.path("/foo.png");
            then.status(200).body("DATA");
        });
        let temp_dir = TempDir::new().unwrap();
        let (fetcher, rx) = fetcher(temp_dir.path().to_path_buf(), "", &server);

        fetcher.request("NES::Foo", "Foo", Some(&server.url("/foo.png")));
        let result = next_result(&rx);
        assert_eq!(result.key, "NES::Foo");
        let path = result.path.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"DATA");
        assert_eq!(fetcher.pending(), 0);

        fetcher.request("NES::Foo", "Foo", Some(&server.url("/foo.png")));
        assert_eq!(next_result(&rx).path, Some(path));
        cover.assert_hits(1);
    }

    // =============================================================
    // Failures
    // =============================================================

    #[test]
    fn test_failure_reports_empty_path_without_api() {
        let server = MockServer::start();
        let gone = server.mock(|when, then| {
            when.path("/gone.png");
            then.status(404);
        });
        let search = server.mock(|when, then| {
            when.path("/api/games");
            then.status(200).json_body(json!({ "results": [] }));
        });
        let temp_dir = TempDir::new().unwrap();
        let (fetcher, rx) = fetcher(temp_dir.path().to_path_buf(), "", &server);

        fetcher.request("NES::Gone", "Gone", Some(&server.url("/gone.png")));
        let result = next_result(&rx);
        assert_eq!(result, FetchResult::failed("NES::Gone"));
        assert!(!fetcher.cache().exists("NES::Gone"));

        // No automatic retry
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_none());
        gone.assert_hits(1);
        assert_eq!(search.hits(), 0);
    }

    #[test]
    fn test_no_url_no_key_still_answers() {
        let server = MockServer::start();
        let search = server.mock(|when, then| {
            when.path("/api/games");
            then.status(200).json_body(json!({ "results": [] }));
        });
        let temp_dir = TempDir::new().unwrap();
        let (fetcher, rx) = fetcher(temp_dir.path().to_path_buf(), "", &server);

        fetcher.request("SNES::Bare", "Bare", None);
        assert_eq!(next_result(&rx), FetchResult::failed("SNES::Bare"));
        assert_eq!(search.hits(), 0);
    }

    #[test]
    fn test_dropped_fetcher_still_answers_in_flight_request() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.path("/slow.png");
            then.status(200)
                .body("LATE")
                .delay(Duration::from_secs(5));
        });
        let temp_dir = TempDir::new().unwrap();
        let (fetcher, rx) = fetcher(temp_dir.path().to_path_buf(), "", &server);

        fetcher.request("NES::Slow", "Slow", Some(&server.url("/slow.png")));
        std::thread::sleep(Duration::from_millis(200));
        drop(fetcher);

        assert_eq!(next_result(&rx), FetchResult::failed("NES::Slow"));
        // Every sender is gone now, so nothing else can arrive
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_none());
        assert!(cover_files(temp_dir.path()).is_empty());
    }

    // =============================================================
    // Coalescing
    // =============================================================

    #[test]
    fn test_concurrent_same_key_coalesced() {
        let server = MockServer::start();
        let slow = server.mock(|when, then| {
            when.path("/slow.png");
            then.status(200)
                .body("SLOWDATA")
                .delay(Duration::from_millis(300));
        });
        let temp_dir = TempDir::new().unwrap();
        let (fetcher, rx) = fetcher(temp_dir.path().to_path_buf(), "", &server);
        let url = server.url("/slow.png");

        fetcher.request("NES::Foo", "Foo", Some(&url));
        fetcher.request("NES::Foo", "Foo", Some(&url));

        let first = next_result(&rx);
        let second = next_result(&rx);
        assert_eq!(first, second);
        assert!(first.is_ready());
        slow.assert_hits(1);

        assert_eq!(cover_files(temp_dir.path()), ["NES__Foo.png"]);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_none());
    }

    #[test]
    fn test_colliding_keys_share_one_download() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.path("/a.png");
            then.status(200)
                .body(vec![b'A'; 1 << 20])
                .delay(Duration::from_millis(300));
        });
        let second = server.mock(|when, then| {
            when.path("/b.png");
            then.status(200).body(vec![b'B'; 1 << 20]);
        });
        let temp_dir = TempDir::new().unwrap();
        let (fetcher, rx) = fetcher(temp_dir.path().to_path_buf(), "", &server);

        // Both keys sanitize to NES__A.png
        fetcher.request("NES::A", "A", Some(&server.url("/a.png")));
        fetcher.request("NES__A", "A", Some(&server.url("/b.png")));
        assert_eq!(fetcher.pending(), 1);

        let mut results = [next_result(&rx), next_result(&rx)];
        results.sort_by(|x, y| x.key.cmp(&y.key));
        assert_eq!(results[0].key, "NES::A");
        assert_eq!(results[1].key, "NES__A");
        let dest = fetcher.cache().path_for("NES::A");
        for result in &results {
            assert_eq!(result.path(), Some(dest.as_path()));
        }

        let body = std::fs::read(&dest).unwrap();
        assert_eq!(body.len(), 1 << 20);
        assert!(body.iter().all(|&b| b == b'A'));
        first.assert_hits(1);
        assert_eq!(second.hits(), 0);
        assert_eq!(cover_files(temp_dir.path()), ["NES__A.png"]);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_none());
    }

    #[test]
    fn test_request_all_one_result_per_game() {
        let server = MockServer::start();
        for name in ["A", "B", "C"] {
            server.mock(|when, then| {
                when.path(format!("/{}.png", name));
                then.status(200).body(name);
            });
        }
        server.mock(|when, then| {
            when.path("/bad.png");
            then.status(500);
        });
        let temp_dir = TempDir::new().unwrap();
        let (fetcher, rx) = fetcher(temp_dir.path().to_path_buf(), "", &server);

        let games: Vec<Game> = ["A", "B", "C", "bad"]
            .iter()
            .map(|name| {
                Game::new("NES", *name, format!("/roms/{}.nes", name))
                    .with_image_url(server.url(format!("/{}.png", name)))
            })
            .collect();
        fetcher.request_all(&games);

        let mut seen = HashSet::new();
        for _ in 0..games.len() {
            let result = next_result(&rx);
            assert_eq!(result.is_ready(), result.key != "NES::bad");
            assert!(seen.insert(result.key));
        }
        assert_eq!(seen.len(), 4);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_none());
    }

    #[test]
    fn test_api_fallback_through_fetcher() {
        let server = MockServer::start();
        let search = server.mock(|when, then| {
            when.path("/api/games").query_param("search", "Golden Sun");
            then.status(200)
                .json_body(json!({ "results": [{ "background_image": server.url("/art.jpg") }] }));
        });
        server.mock(|when, then| {
            when.path("/art.jpg");
            then.status(200).body("ART");
        });
        let temp_dir = TempDir::new().unwrap();
        let (fetcher, rx) = fetcher(temp_dir.path().to_path_buf(), "abc", &server);

        fetcher.request("GBA::Golden Sun", "Golden Sun", None);
        let result = next_result(&rx);
        assert_eq!(std::fs::read(result.path().unwrap()).unwrap(), b"ART");
        search.assert();
    }
}
