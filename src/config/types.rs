use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure for Tutorial-Vault
///
/// Every section has defaults, so an empty TOML document is a valid config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub browser: BrowserConfig,
    pub downloader: DownloaderConfig,
    pub output: OutputConfig,
}

/// Source site description
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL of the site being archived
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path (with query) of the listing page that enumerates guides
    #[serde(rename = "guide-listing-path")]
    pub guide_listing_path: String,

    /// Path (with query) of the listing page that enumerates tutorials
    #[serde(rename = "tutorial-listing-path")]
    pub tutorial_listing_path: String,

    /// Case-insensitive regex stripped from `<title>` text
    #[serde(rename = "title-suffix-pattern")]
    pub title_suffix_pattern: String,

    /// Visible text of the bot-check overlay
    #[serde(rename = "interstitial-text")]
    pub interstitial_text: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://drupalize.me".to_string(),
            guide_listing_path: "/search?f%5B0%5D=type%3Aguide".to_string(),
            tutorial_listing_path: "/search?f%5B0%5D=type%3Atutorial".to_string(),
            title_suffix_pattern: r"\s*\|\s*Drupalize\.Me.*$".to_string(),
            interstitial_text: "Just a moment".to_string(),
        }
    }
}

/// How long `navigate` waits before returning the rendered markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitCondition {
    /// The load event has fired
    Load,
    /// The load event has fired and the document stopped changing
    #[default]
    NetworkIdle,
}

/// Crawl pacing and timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Pause after every guide or tutorial (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Hard limit for a single navigation (seconds)
    #[serde(rename = "navigation-timeout-secs")]
    pub navigation_timeout_secs: u64,

    /// Soft limit for the interstitial overlay to clear (seconds)
    #[serde(rename = "interstitial-timeout-secs")]
    pub interstitial_timeout_secs: u64,

    /// Extra settle time after the interstitial check (milliseconds)
    #[serde(rename = "interstitial-settle-ms")]
    pub interstitial_settle_ms: u64,

    /// Navigation wait condition
    #[serde(rename = "wait-until")]
    pub wait_until: WaitCondition,

    /// Whether to run the standalone tutorial pass after the guides
    #[serde(rename = "scrape-standalone")]
    pub scrape_standalone: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            delay_ms: 2500,
            navigation_timeout_secs: 60,
            interstitial_timeout_secs: 30,
            interstitial_settle_ms: 2000,
            wait_until: WaitCondition::NetworkIdle,
            scrape_standalone: true,
        }
    }
}

/// Browser connection settings
///
/// `cdp-url` selects attach mode, `profile-dir` selects persisted-profile mode,
/// and neither selects a disposable instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Remote debugging endpoint of an already-running browser
    #[serde(rename = "cdp-url")]
    pub cdp_url: Option<String>,

    /// Existing user profile directory to launch with
    #[serde(rename = "profile-dir")]
    pub profile_dir: Option<PathBuf>,

    /// Run a disposable browser without a window
    pub headless: bool,

    /// JSON cookie export to install before crawling
    #[serde(rename = "cookies-file")]
    pub cookies_file: Option<PathBuf>,

    /// Scratch profile directory for the disposable browser
    #[serde(rename = "user-data-dir")]
    pub user_data_dir: Option<PathBuf>,

    /// Explicit Chrome/Chromium binary
    #[serde(rename = "chrome-executable")]
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            cdp_url: None,
            profile_dir: None,
            headless: true,
            cookies_file: None,
            user_data_dir: None,
            chrome_executable: None,
        }
    }
}

/// Media downloader settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Maximum simultaneous asset transfers
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: usize,

    /// Whole-request timeout per asset (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// User agent sent with asset requests
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            timeout_secs: 300,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory of the archive
    #[serde(rename = "vault-dir")]
    pub vault_dir: PathBuf,

    /// Longest file or directory name the layout will produce
    #[serde(rename = "max-filename-length")]
    pub max_filename_length: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            vault_dir: PathBuf::from("vault"),
            max_filename_length: 200,
        }
    }
}

impl Config {
    /// Base URL of the archived site
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.site.base_url)
    }

    /// Absolute URL of the guide listing page
    pub fn guide_listing_url(&self) -> Result<Url, url::ParseError> {
        self.base_url()?.join(&self.site.guide_listing_path)
    }

    /// Absolute URL of the standalone tutorial listing page
    pub fn tutorial_listing_url(&self) -> Result<Url, url::ParseError> {
        self.base_url()?.join(&self.site.tutorial_listing_path)
    }
}

impl CrawlerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn interstitial_timeout(&self) -> Duration {
        Duration::from_secs(self.interstitial_timeout_secs)
    }

    pub fn interstitial_settle(&self) -> Duration {
        Duration::from_millis(self.interstitial_settle_ms)
    }
}
