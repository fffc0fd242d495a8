//! Content extraction from rendered tutorial pages
//!
//! This module turns fetched markup into structured data:
//! - [`ContentExtractor`] builds a [`TutorialRecord`] from a tutorial page
//! - [`discover_links`] and [`guide_overview`] read listing and guide pages
//!
//! Extraction never fails on missing fields; every field has a documented
//! fallback.

mod listing;
mod markup;
mod media;
mod sections;

pub use listing::{discover_links, guide_overview, ListingLink};
pub use media::{extract_images, extract_videos, is_embedded_player, is_video_file};
pub use sections::UNTITLED;

use crate::config::SiteConfig;
use crate::ConfigError;
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use scraper::Html;
use url::Url;

/// A link from the "Additional resources" list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLink {
    pub text: String,
    pub url: String,
}

/// Everything extracted from one tutorial page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialRecord {
    /// Never empty
    pub title: String,
    pub url: String,
    pub topics: Vec<String>,
    pub drupal_versions: Vec<String>,
    pub goal: Option<String>,
    /// Display names of prerequisite tutorials
    pub prerequisites: Vec<String>,
    /// HTML of the body with chrome and the sections above removed
    pub content: String,
    pub recap: Option<String>,
    pub further_understanding: Option<String>,
    pub additional_resources: Vec<ResourceLink>,
    /// Absolute, unique, in order of first appearance
    pub images: Vec<String>,
    /// Absolute, unique, in order of first appearance
    pub videos: Vec<String>,
    pub extracted_at: DateTime<Utc>,
}

impl TutorialRecord {
    /// Videos that can be fetched as files; hosted players are left linked
    pub fn downloadable_videos(&self) -> Vec<String> {
        self.videos
            .iter()
            .filter(|url| !is_embedded_player(url))
            .cloned()
            .collect()
    }
}

/// Parses tutorial pages into [`TutorialRecord`]s
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    title_suffix: Regex,
}

impl ContentExtractor {
    /// Creates an extractor that strips `title_suffix_pattern` from `<title>`
    pub fn new(title_suffix_pattern: &str) -> Result<Self, regex::Error> {
        let title_suffix = RegexBuilder::new(title_suffix_pattern)
            .case_insensitive(true)
            .build()?;
        Ok(Self { title_suffix })
    }

    pub fn from_config(site: &SiteConfig) -> Result<Self, ConfigError> {
        Self::new(&site.title_suffix_pattern).map_err(|e| {
            ConfigError::Validation(format!("title_suffix_pattern is not a valid regex: {}", e))
        })
    }

    /// Extracts a tutorial record, stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `html` - Rendered page markup
    /// * `url` - Absolute URL the page was loaded from
    ///
    /// # Returns
    ///
    /// * `Ok(TutorialRecord)` - The extracted record
    /// * `Err(url::ParseError)` - `url` is not an absolute URL
    pub fn extract(&self, html: &str, url: &str) -> Result<TutorialRecord, url::ParseError> {
        self.extract_at(html, url, Utc::now())
    }

    /// Extracts a tutorial record with an explicit extraction time
    pub fn extract_at(
        &self,
        html: &str,
        url: &str,
        extracted_at: DateTime<Utc>,
    ) -> Result<TutorialRecord, url::ParseError> {
        let page_url = Url::parse(url)?;
        let document = Html::parse_document(html);
        let region = markup::main_region(&document);

        let title = sections::extract_title(&document, &self.title_suffix, url);
        let topics = sections::extract_topics(&document, &region);
        let drupal_versions = sections::extract_versions(&region);

        let goal = sections::find_section(&region, "Goal");
        let recap = sections::find_section(&region, "Recap");
        let further = sections::find_section(&region, "Further your understanding");
        let prereq_list = sections::find_list_section(&region, "prerequisite");
        let resource_list = sections::find_list_section(&region, "additional resource");

        let prerequisites = prereq_list
            .as_ref()
            .map(sections::prerequisites)
            .unwrap_or_default();
        let additional_resources = resource_list
            .as_ref()
            .map(|list| sections::additional_resources(list, &page_url))
            .unwrap_or_default();

        let claimed: Vec<_> = [
            goal.as_ref().map(|s| s.heading),
            prereq_list.as_ref().map(|s| s.heading),
            recap.as_ref().map(|s| s.heading),
            further.as_ref().map(|s| s.heading),
            resource_list.as_ref().map(|s| s.heading),
        ]
        .into_iter()
        .flatten()
        .collect();
        let content = sections::main_content(&document, &region, &claimed);

        let images = extract_images(&document, &page_url);
        let videos = extract_videos(&document, &page_url);

        tracing::debug!(
            "Extracted '{}' ({} topics, {} images, {} videos)",
            title,
            topics.len(),
            images.len(),
            videos.len()
        );

        Ok(TutorialRecord {
            title,
            url: url.to_string(),
            topics,
            drupal_versions,
            goal: goal.map(|s| s.text),
            prerequisites,
            content,
            recap: recap.map(|s| s.text),
            further_understanding: further.map(|s| s.text),
            additional_resources,
            images,
            videos,
            extracted_at,
        })
    }
}
