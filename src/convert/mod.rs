//! Tutorial record to archive document conversion
//!
//! The converter is a pure function of its inputs: the record (including its
//! extraction timestamp), where the document will live, and which media files
//! were stored locally. Converting the same inputs twice gives the same bytes.

mod links;

use crate::document::{ArchiveDocument, DocumentHeader, DocumentResult};
use crate::extract::TutorialRecord;
use crate::media::MediaPaths;
use chrono::SecondsFormat;
use links::{promote_lazy_sources, promote_media_embeds, LinkRewriter};
use std::path::Path;
use url::Url;

/// Where a tutorial sits in the archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentContext {
    /// Owning guide, `None` for standalone tutorials
    pub guide: Option<String>,
    pub subsection: Option<String>,
    /// 1-based position in the guide listing
    pub order: Option<u32>,
}

/// Builds archive documents from tutorial records
#[derive(Debug, Clone)]
pub struct DocumentConverter {
    site: Url,
}

impl DocumentConverter {
    /// Creates a converter for documents taken from `site`
    pub fn new(site: Url) -> Self {
        Self { site }
    }

    /// Converts a record into document text
    ///
    /// # Arguments
    ///
    /// * `record` - The extracted tutorial
    /// * `doc_path` - Path the document will be written to
    /// * `context` - Guide placement recorded in the header
    /// * `media` - Locally stored copies of the record's media
    pub fn convert(
        &self,
        record: &TutorialRecord,
        doc_path: &Path,
        context: &DocumentContext,
        media: &MediaPaths,
    ) -> DocumentResult<String> {
        self.to_document(record, doc_path, context, media).render()
    }

    /// Same as [`convert`](Self::convert) without rendering
    pub fn to_document(
        &self,
        record: &TutorialRecord,
        doc_path: &Path,
        context: &DocumentContext,
        media: &MediaPaths,
    ) -> ArchiveDocument {
        let header = DocumentHeader {
            title: record.title.clone(),
            source_url: record.url.clone(),
            scraped_at: record
                .extracted_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            topics: record.topics.clone(),
            drupal_versions: record.drupal_versions.clone(),
            guide: context.guide.clone(),
            subsection: context.subsection.clone(),
            order: context.order,
        };

        let content = self.content_markdown(record, doc_path, media);
        ArchiveDocument::new(header, render_body(record, &content))
    }

    /// Main content as Markdown with links and media targets rewritten
    fn content_markdown(&self, record: &TutorialRecord, doc_path: &Path, media: &MediaPaths) -> String {
        if record.content.trim().is_empty() {
            return String::new();
        }

        let page = match Url::parse(&record.url) {
            Ok(page) => page,
            Err(_) => self.site.clone(),
        };
        let doc_dir = doc_path.parent().unwrap_or_else(|| Path::new(""));

        let html = promote_media_embeds(&promote_lazy_sources(&record.content), &page);
        let markdown = html2md::parse_html(&html);
        let rewriter = LinkRewriter {
            site: &self.site,
            page: &page,
            doc_dir,
            images: &media.images,
            videos: &media.videos,
        };
        rewriter.rewrite(markdown.trim())
    }
}

/// Lays out the fixed section order; empty sections are left out
fn render_body(record: &TutorialRecord, content: &str) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", record.title));

    if let Some(goal) = non_empty(&record.goal) {
        md.push_str(&format!("## Goal\n\n{}\n\n", goal));
    }

    if !record.prerequisites.is_empty() {
        md.push_str("## Prerequisites\n\n");
        for prerequisite in &record.prerequisites {
            md.push_str(&format!("- [[{}]]\n", prerequisite.trim()));
        }
        md.push('\n');
    }

    if !content.is_empty() {
        md.push_str(&format!("## Content\n\n{}\n\n", content));
    }

    if let Some(recap) = non_empty(&record.recap) {
        md.push_str(&format!("## Recap\n\n{}\n\n", recap));
    }

    if let Some(further) = non_empty(&record.further_understanding) {
        md.push_str(&format!("## Further Your Understanding\n\n{}\n\n", further));
    }

    if !record.additional_resources.is_empty() {
        md.push_str("## Additional Resources\n\n");
        for resource in &record.additional_resources {
            md.push_str(&format!("- [{}]({})\n", resource.text, resource.url));
        }
        md.push('\n');
    }

    let trimmed = md.trim_end().len();
    md.truncate(trimmed);
    md.push('\n');
    md
}

fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ResourceLink;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn create_test_record() -> TutorialRecord {
        TutorialRecord {
            title: "What Are Hooks?".to_string(),
            url: "https://drupalize.me/tutorial/what-are-hooks".to_string(),
            topics: vec!["Module Development".to_string()],
            drupal_versions: vec!["11.x".to_string()],
            goal: Some("Understand hooks.".to_string()),
            prerequisites: vec!["What Are Modules?".to_string()],
            content: r#"<main><p>See <a href="/tutorial/events">Events and subscribers</a>.</p><p><img src="/blank.gif" data-src="/files/hook.png" alt="diagram"></p></main>"#.to_string(),
            recap: None,
            further_understanding: Some("Try hook_help().".to_string()),
            additional_resources: vec![ResourceLink {
                text: "Hooks API".to_string(),
                url: "https://api.drupal.org/hooks".to_string(),
            }],
            images: vec!["https://drupalize.me/files/hook.png".to_string()],
            videos: Vec::new(),
            extracted_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn create_test_media() -> MediaPaths {
        let mut media = MediaPaths::default();
        media.images.insert(
            "https://drupalize.me/files/hook.png".to_string(),
            PathBuf::from("vault/assets/images/hook.png"),
        );
        media
    }

    fn converter() -> DocumentConverter {
        DocumentConverter::new(Url::parse("https://drupalize.me").unwrap())
    }

    fn context() -> DocumentContext {
        DocumentContext {
            guide: Some("Module Development".to_string()),
            subsection: None,
            order: Some(3),
        }
    }

    #[test]
    fn test_convert_full_document() {
        let text = converter()
            .convert(
                &create_test_record(),
                Path::new("vault/Guides/Module Development/What Are Hooks_.md"),
                &context(),
                &create_test_media(),
            )
            .unwrap();

        assert!(text.starts_with("---\n"));
        assert!(text.contains("2024-05-01T12:00:00Z"));
        assert!(text.contains("order: 3"));
        assert!(text.contains("# What Are Hooks?\n\n## Goal\n\nUnderstand hooks.\n\n## Prerequisites\n\n- [[What Are Modules?]]\n"));
        assert!(text.contains("[[Events and subscribers]]"));
        assert!(text.contains("](../../assets/images/hook.png)"));
        assert!(!text.contains("## Recap"));
        assert!(text.contains("## Further Your Understanding\n\nTry hook_help().\n"));
        assert!(text.ends_with("## Additional Resources\n\n- [Hooks API](https://api.drupal.org/hooks)\n"));
    }

    #[test]
    fn test_section_order() {
        let text = converter()
            .convert(
                &create_test_record(),
                Path::new("vault/Guides/Module Development/What Are Hooks_.md"),
                &context(),
                &create_test_media(),
            )
            .unwrap();

        let positions: Vec<usize> = [
            "## Goal",
            "## Prerequisites",
            "## Content",
            "## Further Your Understanding",
            "## Additional Resources",
        ]
        .iter()
        .map(|heading| text.find(heading).unwrap())
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_convert_is_idempotent() {
        let record = create_test_record();
        let path = Path::new("vault/Tutorials/What Are Hooks_.md");
        let first = converter()
            .convert(&record, path, &DocumentContext::default(), &create_test_media())
            .unwrap();
        let second = converter()
            .convert(&record, path, &DocumentContext::default(), &create_test_media())
            .unwrap();

        assert_eq!(first, second);
        assert!(first.contains("](../assets/images/hook.png)"));
        assert!(!first.contains("guide:"));
    }

    #[test]
    fn test_header_round_trips_through_parser() {
        let record = create_test_record();
        let text = converter()
            .convert(
                &record,
                Path::new("vault/Tutorials/x.md"),
                &DocumentContext::default(),
                &MediaPaths::default(),
            )
            .unwrap();

        let doc = ArchiveDocument::parse(&text).unwrap();
        assert_eq!(doc.header.title, record.title);
        assert_eq!(doc.header.source_url, record.url);
        assert_eq!(doc.header.topics, record.topics);
    }

    #[test]
    fn test_undownloaded_image_stays_remote() {
        let text = converter()
            .convert(
                &create_test_record(),
                Path::new("vault/Tutorials/x.md"),
                &DocumentContext::default(),
                &MediaPaths::default(),
            )
            .unwrap();
        assert!(text.contains("](https://drupalize.me/files/hook.png)"));
    }

    #[test]
    fn test_linked_image_uses_local_copy() {
        let mut record = create_test_record();
        record.content =
            r#"<p><a href="/files/hook.png"><img src="/files/hook.png" alt="diagram"></a></p>"#
                .to_string();

        let text = converter()
            .convert(
                &record,
                Path::new("vault/Tutorials/x.md"),
                &DocumentContext::default(),
                &create_test_media(),
            )
            .unwrap();

        assert!(text.contains("![diagram](../assets/images/hook.png)"));
        assert!(!text.contains("https://drupalize.me/files/hook.png"));
    }

    #[test]
    fn test_videos_link_to_local_copies() {
        let mut record = create_test_record();
        record.content = r#"<p>Watch:</p><video controls src="/v/intro.mp4"></video><video><source src="/v/intro.mp4"></video><iframe src="https://player.vimeo.com/video/42"></iframe>"#.to_string();
        record.videos = vec![
            "https://drupalize.me/v/intro.mp4".to_string(),
            "https://player.vimeo.com/video/42".to_string(),
        ];
        let mut media = MediaPaths::default();
        media.videos.insert(
            "https://drupalize.me/v/intro.mp4".to_string(),
            PathBuf::from("vault/assets/videos/intro.mp4"),
        );

        let text = converter()
            .convert(
                &record,
                Path::new("vault/Tutorials/x.md"),
                &DocumentContext::default(),
                &media,
            )
            .unwrap();

        assert!(text.contains("Watch:"));
        assert!(text.contains("[Video](../assets/videos/intro.mp4)"));
        assert!(text.contains("[Video](https://player.vimeo.com/video/42)"));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let mut record = create_test_record();
        record.goal = Some("   ".to_string());
        record.prerequisites.clear();
        record.content.clear();
        record.further_understanding = None;
        record.additional_resources.clear();

        let text = converter()
            .convert(
                &record,
                Path::new("vault/Tutorials/x.md"),
                &DocumentContext::default(),
                &MediaPaths::default(),
            )
            .unwrap();
        assert!(text.ends_with("---\n\n# What Are Hooks?\n"));
    }
}
