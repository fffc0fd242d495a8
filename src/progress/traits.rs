//! Progress store trait and error types

use crate::progress::ProgressState;
use thiserror::Error;

/// Errors that can occur while persisting progress
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to replace progress file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Result type for progress operations
pub type ProgressResult<T> = Result<T, ProgressError>;

/// Durable record of finished work
///
/// Every mark operation is an idempotent set insert that is written back
/// before it returns. A failed write means the unit of work must not be
/// treated as done. Implementations take `&self` and serialize their own
/// load-modify-save cycle.
pub trait ProgressStore {
    /// Returns true if the guide at `url` was fully processed
    fn is_guide_done(&self, url: &str) -> bool;

    /// Returns true if the tutorial at `url` was archived
    fn is_tutorial_done(&self, url: &str) -> bool;

    /// Marks a guide as completed
    fn mark_guide_done(&self, url: &str) -> ProgressResult<()>;

    /// Marks a tutorial as completed
    fn mark_tutorial_done(&self, url: &str) -> ProgressResult<()>;

    /// Records a tutorial failure
    ///
    /// # Arguments
    ///
    /// * `url` - The tutorial URL
    /// * `reason` - Human-readable failure reason
    fn mark_tutorial_failed(&self, url: &str, reason: &str) -> ProgressResult<()>;

    /// Returns the current persisted state
    fn snapshot(&self) -> ProgressState;
}
