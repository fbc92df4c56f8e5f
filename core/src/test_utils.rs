//! Shared test utilities for unit tests

use std::future::Future;

/// Run a future to completion on a throwaway current-thread runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build test runtime")
        .block_on(future)
}

/// HTTP client that ignores proxy settings from the environment.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("failed to build test HTTP client")
}
