use crate::config::types::{
    BrowserConfig, Config, CrawlerConfig, DownloaderConfig, OutputConfig, SiteConfig,
};
use crate::ConfigError;
use regex::RegexBuilder;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_browser_config(&config.browser)?;
    validate_downloader_config(&config.downloader)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the source site description
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url has no host: '{}'",
            config.base_url
        )));
    }

    for (name, path) in [
        ("guide_listing_path", &config.guide_listing_path),
        ("tutorial_listing_path", &config.tutorial_listing_path),
    ] {
        url.join(path).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, path, e))
        })?;
    }

    RegexBuilder::new(&config.title_suffix_pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            ConfigError::Validation(format!("title_suffix_pattern is not a valid regex: {}", e))
        })?;

    if config.interstitial_text.trim().is_empty() {
        return Err(ConfigError::Validation(
            "interstitial_text cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl pacing
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_secs must be >= 1, got {}",
            config.navigation_timeout_secs
        )));
    }

    if config.delay_ms > 600_000 {
        return Err(ConfigError::Validation(format!(
            "delay_ms must be <= 600000ms, got {}ms",
            config.delay_ms
        )));
    }

    Ok(())
}

/// Validates that exactly one browser connection mode can be derived
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.cdp_url.is_some() && config.profile_dir.is_some() {
        return Err(ConfigError::Validation(
            "cdp_url and profile_dir are mutually exclusive".to_string(),
        ));
    }

    if let Some(endpoint) = &config.cdp_url {
        let url = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid cdp_url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConfigError::InvalidUrl(format!(
                "cdp_url must use http(s) or ws(s), got '{}'",
                endpoint
            )));
        }
    }

    Ok(())
}

/// Validates downloader settings
fn validate_downloader_config(config: &DownloaderConfig) -> Result<(), ConfigError> {
    if config.max_concurrent < 1 || config.max_concurrent > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent must be between 1 and 64, got {}",
            config.max_concurrent
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.vault_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "vault_dir cannot be empty".to_string(),
        ));
    }

    if config.max_filename_length < 16 || config.max_filename_length > 255 {
        return Err(ConfigError::Validation(format!(
            "max_filename_length must be between 16 and 255, got {}",
            config.max_filename_length
        )));
    }

    Ok(())
}
