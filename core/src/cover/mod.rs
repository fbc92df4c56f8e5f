//! Cover art: on-disk cache, download worker and request coordinator.
//!
//! # Flow
//!
//! 1. The UI calls [`CoverFetcher::request`] for each visible game
//! 2. Cached covers are answered immediately from [`CoverCache`]
//! 3. Misses are downloaded on the fetcher's runtime ([`worker::fetch_cover`]):
//!    direct URL first, then the RAWG search fallback
//! 4. Every request produces exactly one `ImageReady` event

pub mod cache;
pub mod fetcher;
pub mod worker;

pub use cache::{CacheError, CoverCache, sanitize_key};
pub use fetcher::CoverFetcher;
pub use worker::{FetchError, FetchSettings};
