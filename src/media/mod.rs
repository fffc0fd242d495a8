//! Media asset downloading
//!
//! Images and videos referenced by a tutorial are stored once under the
//! archive's asset directories. A source URL always maps to the same file
//! name, so a second encounter is a no-op.

mod downloader;
mod naming;

pub use downloader::{build_http_client, MediaDownloader, MediaPaths};
pub use naming::media_filename;

use thiserror::Error;

/// The two asset families the archive stores separately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Extension used when the URL does not carry one
    pub fn default_extension(self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }
}

/// Errors for a single asset transfer
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DownloadResult<T> = Result<T, DownloadError>;
