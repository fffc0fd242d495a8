//! Archive document format
//!
//! Every persisted tutorial starts with a YAML metadata block between `---`
//! fences, followed by Markdown. This module is the only reader and writer of
//! that block; the layout manager, the crawler and the index rebuilders all
//! go through [`ArchiveDocument`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory index documents, which carry no header
pub const INDEX_FILE: &str = "_index.md";

/// Errors raised while reading archive documents
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document has no metadata header")]
    MissingHeader,

    #[error("Invalid metadata header: {0}")]
    Header(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Metadata block of an archive document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub title: String,

    pub source_url: String,

    /// RFC 3339 extraction timestamp
    pub scraped_at: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drupal_versions: Vec<String>,

    /// Owning guide, absent for standalone tutorials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,

    /// 1-based position in the guide's listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

/// A parsed archive document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDocument {
    pub header: DocumentHeader,
    pub body: String,
}

impl ArchiveDocument {
    pub fn new(header: DocumentHeader, body: impl Into<String>) -> Self {
        Self {
            header,
            body: body.into(),
        }
    }

    /// Splits a document into header and body
    ///
    /// # Arguments
    ///
    /// * `text` - Full document text
    ///
    /// # Returns
    ///
    /// * `Ok(ArchiveDocument)` - Parsed document
    /// * `Err(DocumentError::MissingHeader)` - No `---` fenced block at the top
    /// * `Err(DocumentError::Header)` - The block is not a valid header
    pub fn parse(text: &str) -> DocumentResult<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let rest = text
            .strip_prefix("---\n")
            .or_else(|| text.strip_prefix("---\r\n"))
            .ok_or(DocumentError::MissingHeader)?;

        let (yaml, body) = split_at_fence(rest).ok_or(DocumentError::MissingHeader)?;
        let header: DocumentHeader = serde_yaml::from_str(yaml)?;

        let body = body
            .strip_prefix("\r\n")
            .or_else(|| body.strip_prefix('\n'))
            .unwrap_or(body);

        Ok(Self {
            header,
            body: body.to_string(),
        })
    }

    /// Renders the document back to text
    pub fn render(&self) -> DocumentResult<String> {
        let yaml = serde_yaml::to_string(&self.header)?;
        Ok(format!("---\n{}---\n\n{}", yaml, self.body))
    }

    /// Reads and parses a document from disk
    pub fn read(path: &Path) -> DocumentResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Renders and writes the document
    pub fn write(&self, path: &Path) -> DocumentResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render()?)?;
        Ok(())
    }
}

/// Finds the closing `---` line; returns (header, remainder)
fn split_at_fence(rest: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Reads just the header of a document, if it has a valid one
pub fn read_header(path: &Path) -> Option<DocumentHeader> {
    match ArchiveDocument::read(path) {
        Ok(doc) => Some(doc.header),
        Err(e) => {
            tracing::debug!("Skipping {}: {}", path.display(), e);
            None
        }
    }
}

/// Collects every archive document under `dir`, sorted by path
///
/// Index documents and files without a valid header are skipped.
pub fn collect_documents(dir: &Path) -> DocumentResult<Vec<(PathBuf, DocumentHeader)>> {
    let mut found = Vec::new();
    if dir.is_dir() {
        walk(dir, &mut found)?;
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<(PathBuf, DocumentHeader)>) -> DocumentResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, found)?;
            continue;
        }

        let is_markdown = path.extension().is_some_and(|ext| ext == "md");
        let is_index = path.file_name().is_some_and(|name| name == INDEX_FILE);
        if !is_markdown || is_index {
            continue;
        }

        if let Some(header) = read_header(&path) {
            found.push((path, header));
        }
    }
    Ok(())
}

/// Finds the document under `dir` that was archived from `source_url`
pub fn find_by_source(
    dir: &Path,
    source_url: &str,
) -> DocumentResult<Option<(PathBuf, DocumentHeader)>> {
    Ok(collect_documents(dir)?
        .into_iter()
        .find(|(_, header)| header.source_url == source_url))
}
