//! Markdown link and media target rewriting

use crate::extract::is_embedded_player;
use crate::layout::{last_segment, slug_to_title};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

// `![alt](target "title")`
static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#)
        .expect("MARKDOWN_IMAGE: hardcoded regex is valid")
});

// `[text](target "title")`; the text may hold one image, as in `[![alt](img)](href)`.
// A leading `!` marks a bare image, which the link pass leaves alone.
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(!?)\[((?:!\[[^\]]*\]\([^)]*\)|[^\]])*)\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#,
    )
    .expect("MARKDOWN_LINK: hardcoded regex is valid")
});

static VIDEO_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<video\b[^>]*>.*?</video>")
        .expect("VIDEO_BLOCK: hardcoded regex is valid")
});

static SOURCE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:video|source)\b[^>]*>").expect("SOURCE_TAG: hardcoded regex is valid")
});

static IFRAME_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<iframe\b[^>]*>(?:.*?</iframe>)?")
        .expect("IFRAME_TAG: hardcoded regex is valid")
});

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("IMG_TAG: hardcoded regex is valid"));

static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\ssrc\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("SRC_ATTR: hardcoded regex is valid")
});

static DATA_SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\sdata-src\s*=\s*("[^"]+"|'[^']+')"#)
        .expect("DATA_SRC_ATTR: hardcoded regex is valid")
});

/// Makes lazy-loaded images render their real source
///
/// An `<img>` carrying `data-src` loses its placeholder `src` and the
/// `data-src` value takes its place.
pub(crate) fn promote_lazy_sources(html: &str) -> String {
    IMG_TAG
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            let Some(data_src) = DATA_SRC_ATTR.captures(tag) else {
                return tag.to_string();
            };
            let value = data_src[1].to_string();
            let without_src = SRC_ATTR.replace_all(tag, "");
            DATA_SRC_ATTR
                .replace(&without_src, format!(" src={}", value))
                .into_owned()
        })
        .into_owned()
}

/// Replaces `<video>` elements and player `<iframe>`s with plain links
///
/// The Markdown conversion drops both element kinds, so each distinct video
/// source becomes an `<a>` resolved against `page`. Iframes that are not
/// hosted players are left as they are.
pub(crate) fn promote_media_embeds(html: &str, page: &Url) -> String {
    let html = VIDEO_BLOCK.replace_all(html, |caps: &Captures| {
        let mut sources: Vec<String> = Vec::new();
        for tag in SOURCE_TAG.find_iter(&caps[0]) {
            if let Some(url) = src_url(tag.as_str(), page) {
                if !sources.contains(&url) {
                    sources.push(url);
                }
            }
        }
        sources
            .iter()
            .map(|url| video_anchor(url))
            .collect::<String>()
    });

    IFRAME_TAG
        .replace_all(&html, |caps: &Captures| {
            let tag = &caps[0];
            match src_url(tag, page) {
                Some(url) if is_embedded_player(&url) => video_anchor(&url),
                _ => tag.to_string(),
            }
        })
        .into_owned()
}

fn src_url(tag: &str, page: &Url) -> Option<String> {
    let caps = SRC_ATTR.captures(tag)?;
    let value = caps[1].trim_matches(|c| c == '"' || c == '\'');
    if value.is_empty() {
        return None;
    }
    page.join(value).ok().map(String::from)
}

fn video_anchor(url: &str) -> String {
    format!(r#"<p><a href="{}">Video</a></p>"#, url)
}

/// Rewrites the targets of every Markdown link and image in a document body
pub(crate) struct LinkRewriter<'a> {
    /// Site the archive was taken from
    pub site: &'a Url,
    /// URL of the page being converted
    pub page: &'a Url,
    /// Directory the document will be written to
    pub doc_dir: &'a Path,
    pub images: &'a HashMap<String, PathBuf>,
    pub videos: &'a HashMap<String, PathBuf>,
}

impl LinkRewriter<'_> {
    /// Images first, then links, so an image nested in a link is rewritten too
    pub(crate) fn rewrite(&self, markdown: &str) -> String {
        let with_images =
            MARKDOWN_IMAGE.replace_all(markdown, |caps: &Captures| self.image(&caps[1], &caps[2]));

        MARKDOWN_LINK
            .replace_all(&with_images, |caps: &Captures| {
                if caps[1].is_empty() {
                    self.link(&caps[2], &caps[3])
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    fn image(&self, alt: &str, target: &str) -> String {
        match self.absolute(target) {
            Some(url) => match self.images.get(url.as_str()) {
                Some(local) => format!("![{}]({})", alt, self.relative(local)),
                None => format!("![{}]({})", alt, url),
            },
            None => format!("![{}]({})", alt, target),
        }
    }

    fn link(&self, text: &str, target: &str) -> String {
        let Some(url) = self.absolute(target) else {
            return format!("[{}]({})", text, target);
        };

        if let Some(local) = self
            .videos
            .get(url.as_str())
            .or_else(|| self.images.get(url.as_str()))
        {
            return format!("[{}]({})", text, self.relative(local));
        }

        if self.is_internal(&url) && !text.trim_start().starts_with("![") {
            return cross_reference(text, &url);
        }

        format!("[{}]({})", text, url)
    }

    /// Absolute form of an http(s) or root-relative target; `None` leaves
    /// the target as written
    fn absolute(&self, target: &str) -> Option<Url> {
        if target.starts_with("http://") || target.starts_with("https://") {
            return Url::parse(target).ok();
        }
        if target.starts_with('/') {
            return self.page.join(target).ok();
        }
        None
    }

    /// Same-site tutorial or guide page
    fn is_internal(&self, url: &Url) -> bool {
        if url.host_str() != self.site.host_str() {
            return false;
        }
        let path = url.path();
        path.starts_with("/tutorial/") || path.starts_with("/guide/")
    }

    fn relative(&self, local: &Path) -> String {
        let relative = pathdiff::diff_paths(local, self.doc_dir).unwrap_or_else(|| local.to_path_buf());
        relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// A title link to another archive document
///
/// The visible text is used when it reads like a title, otherwise the title
/// is derived from the last path segment.
pub(crate) fn cross_reference(text: &str, url: &Url) -> String {
    let text = text.trim();
    if text.chars().count() > 3 && !text.starts_with("http") {
        return format!("[[{}]]", text);
    }
    match last_segment(url) {
        Some(slug) => format!("[[{}]]", slug_to_title(slug)),
        None => format!("[[{}]]", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote_lazy_sources() {
        let html = r#"<p><img src="/blank.gif" data-src="/files/real.png" alt="x"></p><img src="/plain.png">"#;
        let promoted = promote_lazy_sources(html);
        assert!(promoted.contains(r#"src="/files/real.png""#));
        assert!(!promoted.contains("blank.gif"));
        assert!(!promoted.contains("data-src"));
        assert!(promoted.contains(r#"<img src="/plain.png">"#));
    }

    #[test]
    fn test_cross_reference_prefers_text() {
        let url = Url::parse("https://drupalize.me/tutorial/configure-views").unwrap();
        assert_eq!(cross_reference("Configuring Views", &url), "[[Configuring Views]]");
        assert_eq!(cross_reference("here", &url), "[[Configure Views]]");
        assert_eq!(
            cross_reference("https://drupalize.me/tutorial/configure-views", &url),
            "[[Configure Views]]"
        );
    }

    #[test]
    fn test_rewrite_targets() {
        let site = Url::parse("https://drupalize.me").unwrap();
        let page = Url::parse("https://drupalize.me/tutorial/hooks").unwrap();
        let mut images = HashMap::new();
        images.insert(
            "https://drupalize.me/files/a.png".to_string(),
            PathBuf::from("vault/assets/images/a.png"),
        );
        let mut videos = HashMap::new();
        videos.insert(
            "https://cdn.example.com/v.mp4".to_string(),
            PathBuf::from("vault/assets/videos/v.mp4"),
        );
        let rewriter = LinkRewriter {
            site: &site,
            page: &page,
            doc_dir: Path::new("vault/Guides/Module Development"),
            images: &images,
            videos: &videos,
        };

        let markdown = "![diagram](/files/a.png) ![gone](https://x.test/b.png) ![local](img/c.png)\n\
            [Watch](https://cdn.example.com/v.mp4) [Events](/tutorial/events) \
            [PHP](https://www.php.net/) [top](#top)\n\
            [![thumb](/files/a.png)](/files/a.png) [![remote](https://x.test/b.png)](/tutorial/events)";
        let rewritten = rewriter.rewrite(markdown);

        assert!(rewritten.contains("![diagram](../../assets/images/a.png)"));
        assert!(rewritten.contains("![gone](https://x.test/b.png)"));
        assert!(rewritten.contains("![local](img/c.png)"));
        assert!(rewritten.contains("[Watch](../../assets/videos/v.mp4)"));
        assert!(rewritten.contains("[[Events]]"));
        assert!(rewritten.contains("[PHP](https://www.php.net/)"));
        assert!(rewritten.contains("[top](#top)"));
        assert!(rewritten
            .contains("[![thumb](../../assets/images/a.png)](../../assets/images/a.png)"));
        assert!(rewritten
            .contains("[![remote](https://x.test/b.png)](https://drupalize.me/tutorial/events)"));
    }

    #[test]
    fn test_promote_media_embeds() {
        let page = Url::parse("https://drupalize.me/tutorial/hooks").unwrap();
        let html = r#"<p>Watch:</p><video controls src="/v/intro.mp4"></video><video><source src="/v/intro.mp4" type="video/mp4"><source src="/v/intro.webm"></video><iframe src="https://www.youtube.com/embed/abc"></iframe><iframe src="/widgets/poll"></iframe>"#;
        let promoted = promote_media_embeds(html, &page);

        assert!(!promoted.contains("<video"));
        assert_eq!(
            promoted.matches(r#"<a href="https://drupalize.me/v/intro.mp4">Video</a>"#).count(),
            2
        );
        assert!(promoted.contains(r#"<a href="https://drupalize.me/v/intro.webm">Video</a>"#));
        assert!(promoted.contains(r#"<a href="https://www.youtube.com/embed/abc">Video</a>"#));
        assert!(promoted.contains(r#"<iframe src="/widgets/poll"></iframe>"#));
    }
}
