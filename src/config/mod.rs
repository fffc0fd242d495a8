//! Configuration module for Tutorial-Vault
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; a missing file yields the built-in defaults.
//!
//! # Example
//!
//! ```no_run
//! use tutorial_vault::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("vault.toml")).unwrap();
//! println!("Archiving {} into {}", config.site.base_url, config.output.vault_dir.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, CrawlerConfig, DownloaderConfig, OutputConfig, SiteConfig,
    WaitCondition,
};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
pub use validation::validate;
