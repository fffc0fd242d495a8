//! Small helpers over the parsed document tree

use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use url::Url;

pub(crate) static MAIN_REGION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main").expect("MAIN_REGION: hardcoded selector is valid"));

pub(crate) static ARTICLE_REGION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("article").expect("ARTICLE_REGION: hardcoded selector is valid")
});

pub(crate) static HEADINGS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6").expect("HEADINGS: hardcoded selector is valid")
});

/// The element tutorial content lives in: `<main>`, else `<article>`, else the root
pub(crate) fn main_region(document: &Html) -> ElementRef<'_> {
    document
        .select(&MAIN_REGION)
        .next()
        .or_else(|| document.select(&ARTICLE_REGION).next())
        .unwrap_or_else(|| document.root_element())
}

/// Heading level of an element, `None` if it is not `h1`..`h6`
pub(crate) fn heading_level(element: &ElementRef<'_>) -> Option<u8> {
    match element.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Text content with whitespace runs collapsed to single spaces
pub(crate) fn inline_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content with one line per non-empty text node
pub(crate) fn block_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Following sibling elements of `heading` up to the next heading of equal
/// or higher rank; bare text between elements is returned as text
pub(crate) fn section_siblings<'a>(heading: &ElementRef<'a>) -> Vec<SectionPart<'a>> {
    let level = heading_level(heading).unwrap_or(6);
    let mut parts = Vec::new();

    for node in heading.next_siblings() {
        match node.value() {
            Node::Element(_) => {
                let Some(element) = ElementRef::wrap(node) else {
                    continue;
                };
                if heading_level(&element).is_some_and(|l| l <= level) {
                    break;
                }
                parts.push(SectionPart::Element(element));
            }
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    parts.push(SectionPart::Text(node.id(), text.to_string()));
                }
            }
            _ => {}
        }
    }
    parts
}

/// A piece of a section body
pub(crate) enum SectionPart<'a> {
    Element(ElementRef<'a>),
    Text(ego_tree::NodeId, String),
}

impl SectionPart<'_> {
    pub(crate) fn id(&self) -> ego_tree::NodeId {
        match self {
            SectionPart::Element(element) => element.id(),
            SectionPart::Text(id, _) => *id,
        }
    }

    pub(crate) fn text(&self) -> String {
        match self {
            SectionPart::Element(element) => block_text(element),
            SectionPart::Text(_, text) => text.clone(),
        }
    }
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Non-HTTP(S) URLs after resolution
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute)
    } else {
        None
    }
}

/// Appends `url` unless it is already present
pub(crate) fn push_unique(list: &mut Vec<String>, url: String) {
    if !list.contains(&url) {
        list.push(url);
    }
}
