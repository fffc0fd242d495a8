//! On-disk layout of the archive
//!
//! ```text
//! vault/
//! ├── Guides/<guide>/[<subsection>/]<tutorial>.md
//! ├── Guides/<guide>/_index.md
//! ├── Tutorials/<tutorial>.md, _index.md
//! ├── Topics/<topic>.md
//! ├── assets/images, assets/videos
//! └── _metadata/progress.json
//! ```

mod index;
mod naming;

pub use index::{
    group_by_topic, render_guide_index, render_standalone_index, render_topic_index, wiki_link,
    GuideRecord, TopicEntry, TutorialEntry,
};
pub use naming::{last_segment, sanitize_name, slug_to_title, title_from_url};

use crate::document::{collect_documents, read_header, DocumentResult, INDEX_FILE};
use crate::media::MediaKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Owns every path the archive writes to
#[derive(Debug, Clone)]
pub struct VaultLayout {
    root: PathBuf,
    max_name_len: usize,
}

impl VaultLayout {
    /// Creates a layout rooted at `root`
    ///
    /// # Arguments
    ///
    /// * `root` - Archive root directory
    /// * `max_name_len` - Longest file or directory name to produce
    pub fn new(root: impl Into<PathBuf>, max_name_len: usize) -> Self {
        Self {
            root: root.into(),
            max_name_len,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn guides_dir(&self) -> PathBuf {
        self.root.join("Guides")
    }

    pub fn topics_dir(&self) -> PathBuf {
        self.root.join("Topics")
    }

    /// Home of tutorials that belong to no guide
    pub fn standalone_dir(&self) -> PathBuf {
        self.root.join("Tutorials")
    }

    pub fn assets_dir(&self, kind: MediaKind) -> PathBuf {
        match kind {
            MediaKind::Image => self.root.join("assets").join("images"),
            MediaKind::Video => self.root.join("assets").join("videos"),
        }
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("_metadata")
    }

    pub fn progress_path(&self) -> PathBuf {
        self.metadata_dir().join("progress.json")
    }

    /// Creates the directory skeleton
    pub fn initialize(&self) -> std::io::Result<()> {
        for dir in [
            self.guides_dir(),
            self.topics_dir(),
            self.standalone_dir(),
            self.assets_dir(MediaKind::Image),
            self.assets_dir(MediaKind::Video),
            self.metadata_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Sanitizes a display name with this layout's length ceiling
    pub fn safe_name(&self, name: &str) -> String {
        sanitize_name(name, self.max_name_len)
    }

    /// Directory of a guide
    pub fn guide_dir(&self, guide_name: &str) -> PathBuf {
        self.guides_dir().join(self.safe_name(guide_name))
    }

    /// Chooses the document path for a tutorial
    ///
    /// The file is named after the title. If that name is already taken by a
    /// document archived from a different URL, ` (2)`, ` (3)`, ... is appended
    /// until a free or matching name is found, so the same source URL always
    /// lands on the same file.
    ///
    /// # Arguments
    ///
    /// * `parent` - Guide or standalone directory
    /// * `title` - Tutorial title
    /// * `subsection` - Optional subsection directory inside `parent`
    /// * `source_url` - URL the tutorial was archived from
    pub fn tutorial_path(
        &self,
        parent: &Path,
        title: &str,
        subsection: Option<&str>,
        source_url: &str,
    ) -> PathBuf {
        let dir = match subsection {
            Some(subsection) => parent.join(self.safe_name(subsection)),
            None => parent.to_path_buf(),
        };

        let mut attempt = 1u32;
        loop {
            let suffix = if attempt == 1 {
                String::new()
            } else {
                format!(" ({})", attempt)
            };
            let budget = self.max_name_len.saturating_sub(suffix.len() + 3).max(1);
            let stem = format!("{}{}", sanitize_name(title, budget), suffix);
            let candidate = dir.join(format!("{}.md", stem));

            if !candidate.exists() {
                return candidate;
            }
            match read_header(&candidate) {
                Some(header) if header.source_url == source_url => return candidate,
                _ => {
                    debug!("{} is taken, trying next suffix", candidate.display());
                    attempt += 1;
                }
            }
        }
    }

    /// Writes a guide's `_index.md`
    pub fn write_guide_index(&self, guide: &GuideRecord) -> std::io::Result<PathBuf> {
        let dir = self.guide_dir(&guide.name);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(INDEX_FILE);
        std::fs::write(&path, render_guide_index(guide))?;
        Ok(path)
    }

    /// Regenerates `Tutorials/_index.md` from the documents on disk
    pub fn rebuild_standalone_index(&self) -> DocumentResult<usize> {
        let entries: Vec<TutorialEntry> = collect_documents(&self.standalone_dir())?
            .into_iter()
            .map(|(path, header)| TutorialEntry {
                link: file_stem(&path),
                title: header.title,
                subsection: header.subsection,
                order: header.order.unwrap_or(0),
                url: header.source_url,
            })
            .collect();

        std::fs::create_dir_all(self.standalone_dir())?;
        std::fs::write(
            self.standalone_dir().join(INDEX_FILE),
            render_standalone_index(&entries),
        )?;
        Ok(entries.len())
    }

    /// Regenerates every `Topics/<topic>.md` from the documents on disk
    ///
    /// # Returns
    ///
    /// The number of topic indexes written
    pub fn rebuild_topic_indexes(&self) -> DocumentResult<usize> {
        let mut docs = collect_documents(&self.guides_dir())?;
        docs.extend(collect_documents(&self.standalone_dir())?);

        let tagged = docs.into_iter().flat_map(|(path, header)| {
            let link = file_stem(&path);
            header
                .topics
                .iter()
                .map(|topic| {
                    (
                        topic.clone(),
                        TopicEntry {
                            guide: header.guide.clone(),
                            order: header.order.unwrap_or(0),
                            title: header.title.clone(),
                            link: link.clone(),
                        },
                    )
                })
                .collect::<Vec<_>>()
        });

        let topics = group_by_topic(tagged);
        std::fs::create_dir_all(self.topics_dir())?;
        for (topic, entries) in &topics {
            let path = self.topics_dir().join(format!("{}.md", self.safe_name(topic)));
            std::fs::write(path, render_topic_index(topic, entries))?;
        }

        Ok(topics.len())
    }
}

/// File stem as a wiki link target
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
