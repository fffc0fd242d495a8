//! Progress tracking for resumable crawls
//!
//! This module records which guides and tutorials are finished so an
//! interrupted run can pick up where it stopped:
//! - `ProgressStore` is the contract the orchestrator talks to
//! - `JsonProgressStore` persists it as a single JSON document

mod json;
mod traits;

pub use json::JsonProgressStore;
pub use traits::{ProgressError, ProgressResult, ProgressStore};

use serde::{Deserialize, Serialize};

/// A tutorial that failed, with the reason it failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTutorial {
    pub url: String,
    pub error: String,
}

/// The persisted progress document
///
/// Lists keep insertion order so the file reads chronologically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default)]
    pub completed_guides: Vec<String>,

    #[serde(default)]
    pub completed_tutorials: Vec<String>,

    #[serde(default)]
    pub failed_tutorials: Vec<FailedTutorial>,
}

impl ProgressState {
    pub fn is_guide_done(&self, url: &str) -> bool {
        self.completed_guides.iter().any(|u| u == url)
    }

    pub fn is_tutorial_done(&self, url: &str) -> bool {
        self.completed_tutorials.iter().any(|u| u == url)
    }

    /// Inserts a guide URL; returns false if it was already present
    pub fn insert_guide(&mut self, url: &str) -> bool {
        if self.is_guide_done(url) {
            return false;
        }
        self.completed_guides.push(url.to_string());
        true
    }

    /// Inserts a tutorial URL and clears any earlier failure for it
    pub fn insert_tutorial(&mut self, url: &str) -> bool {
        let before = self.failed_tutorials.len();
        self.failed_tutorials.retain(|f| f.url != url);
        let cleared = before != self.failed_tutorials.len();

        if self.is_tutorial_done(url) {
            return cleared;
        }
        self.completed_tutorials.push(url.to_string());
        true
    }

    /// Records a failure, replacing an older reason for the same URL
    pub fn insert_failure(&mut self, url: &str, error: &str) -> bool {
        if let Some(existing) = self.failed_tutorials.iter_mut().find(|f| f.url == url) {
            if existing.error == error {
                return false;
            }
            existing.error = error.to_string();
            return true;
        }
        self.failed_tutorials.push(FailedTutorial {
            url: url.to_string(),
            error: error.to_string(),
        });
        true
    }
}
