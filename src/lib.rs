//! Tutorial-Vault: an offline archiver for guide/tutorial websites
//!
//! This crate crawls a structured content site (guides made of ordered tutorials)
//! through a controlled browser session and writes a link-consistent, resumable
//! Markdown knowledge base with locally stored media.

pub mod browser;
pub mod config;
pub mod convert;
pub mod crawler;
pub mod document;
pub mod extract;
pub mod layout;
pub mod media;
pub mod progress;

use thiserror::Error;

/// Main error type for Tutorial-Vault operations
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Fetch(#[from] browser::FetchError),

    #[error("Progress store error: {0}")]
    Progress(#[from] progress::ProgressError),

    #[error("Download error: {0}")]
    Download(#[from] media::DownloadError),

    #[error("Archive document error: {0}")]
    Document(#[from] document::DocumentError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Tutorial-Vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlPhase, Crawler};
pub use extract::TutorialRecord;
pub use progress::{JsonProgressStore, ProgressStore};
