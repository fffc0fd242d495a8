//! Crawl orchestration
//!
//! The crawler walks the site strictly sequentially:
//! - discover guides from the guide listing
//! - for each guide, discover and archive its tutorials in listing order
//! - archive standalone tutorials from the tutorial listing
//! - regenerate the standalone and topic indexes
//!
//! Progress is consulted before and recorded after every unit of work, so an
//! interrupted run resumes without fetching anything twice.

mod coordinator;

pub use coordinator::{CrawlSummary, Crawler};

use std::fmt;

/// Where the crawler currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    DiscoveringGuides,
    ScrapingGuide { guide: String },
    ScrapingTutorial { guide: Option<String>, tutorial: String },
    ScrapingStandalone,
    Done,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlPhase::Idle => write!(f, "idle"),
            CrawlPhase::DiscoveringGuides => write!(f, "discovering guides"),
            CrawlPhase::ScrapingGuide { guide } => write!(f, "scraping guide '{}'", guide),
            CrawlPhase::ScrapingTutorial {
                guide: Some(guide),
                tutorial,
            } => write!(f, "scraping tutorial '{}' of '{}'", tutorial, guide),
            CrawlPhase::ScrapingTutorial {
                guide: None,
                tutorial,
            } => write!(f, "scraping standalone tutorial '{}'", tutorial),
            CrawlPhase::ScrapingStandalone => write!(f, "scraping standalone tutorials"),
            CrawlPhase::Done => write!(f, "done"),
        }
    }
}
