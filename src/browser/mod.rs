//! Browser-backed page fetching
//!
//! The crawler only sees the [`PageFetcher`] trait. [`BrowserSession`] is the
//! production implementation, driving Chrome over the DevTools protocol in
//! one of three connection modes.

mod cookies;
mod session;
mod stealth;

pub use cookies::{
    normalize_cookies, normalize_same_site, read_cookie_file, write_cookie_file, CanonicalCookie,
    CookieError,
};
pub use session::{BrowserSession, ConnectionMode};

use crate::config::WaitCondition;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a page fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Could not attach to browser at {endpoint}: {message}")]
    AttachFailed { endpoint: String, message: String },

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Cookie error: {0}")]
    Cookies(#[from] CookieError),

    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// A single tab the crawler drives, one navigation at a time
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Navigates to `url` and returns the rendered markup
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to load
    /// * `wait` - Condition that marks the navigation as settled
    /// * `timeout` - Hard limit for the whole navigation
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The page's HTML once `wait` is satisfied
    /// * `Err(FetchError::NavigationTimeout)` - `timeout` elapsed first
    async fn navigate(&self, url: &str, wait: WaitCondition, timeout: Duration)
        -> FetchResult<String>;

    /// Waits for a verification overlay to clear
    ///
    /// Best effort: returns after `timeout` even if the overlay is still
    /// present. Returns true if the overlay was seen at all.
    async fn wait_for_interstitial(&self, timeout: Duration) -> bool;

    /// Current markup of the tab
    async fn content(&self) -> FetchResult<String>;

    /// Installs cookies from an export file
    ///
    /// Malformed files are logged and ignored; returns the number installed.
    async fn import_cookies(&self, path: &Path) -> usize;

    /// Writes the session's cookies in the shape `import_cookies` accepts
    async fn export_cookies(&self, path: &Path) -> FetchResult<usize>;

    /// Releases whatever this fetcher allocated
    async fn close(&mut self) -> FetchResult<()>;
}
