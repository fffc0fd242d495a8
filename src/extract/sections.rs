//! Field extraction strategies
//!
//! Each function tries its strategies in order and falls back quietly; a
//! missing field is never an error.

use crate::extract::markup::{
    heading_level, inline_text, resolve_link, section_siblings, HEADINGS,
};
use crate::extract::ResourceLink;
use crate::layout::title_from_url;
use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Title selectors, most specific first
const TITLE_SELECTORS: &[&str] = &[
    "main h1",
    "article h1",
    "[role=\"article\"] h1",
    "h1",
    ".field--name-title",
];

pub const UNTITLED: &str = "Untitled Tutorial";

static TITLE_TAG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("TITLE_TAG: hardcoded selector is valid"));

static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("LINKS: hardcoded selector is valid"));

static META_PROPERTY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property][content]").expect("META_PROPERTY: hardcoded selector is valid")
});

static LIST_HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3").expect("LIST_HEADINGS: hardcoded selector is valid"));

static CHROME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("nav, header, footer, aside").expect("CHROME: hardcoded selector is valid")
});

static TOPIC_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/topic/|/tag/").expect("TOPIC_HREF: hardcoded regex is valid"));

static TOPIC_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)topic|tag").expect("TOPIC_PROPERTY: hardcoded regex is valid")
});

static VERSION_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/version/|/drupal-\d+").expect("VERSION_HREF: hardcoded regex is valid")
});

static VERSION_IN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:drupal\s+)?(\d+\.\d+\.x|\d+\.x|\d+\.\d+|\d+)\b")
        .expect("VERSION_IN_LINK: hardcoded regex is valid")
});

// Free text only counts when it says "Drupal N" or uses the N.N.x branch form
static VERSION_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bdrupal\s+(\d+(?:\.\d+)?(?:\.x)?)\b|\b(\d+\.\d+\.x)\b")
        .expect("VERSION_IN_TEXT: hardcoded regex is valid")
});

/// Resolves the tutorial title
///
/// Order: heading selectors, then `<title>` without the site suffix, then a
/// title derived from the URL slug, then a fixed placeholder.
pub fn extract_title(document: &Html, title_suffix: &Regex, url: &str) -> String {
    for css in TITLE_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(title) = document
            .select(&selector)
            .map(|el| inline_text(&el))
            .find(|t| !t.is_empty())
        {
            return title;
        }
    }

    if let Some(element) = document.select(&TITLE_TAG).next() {
        let title = title_suffix.replace(&inline_text(&element), "").trim().to_string();
        if !title.is_empty() {
            return title;
        }
    }

    title_from_url(url).unwrap_or_else(|| UNTITLED.to_string())
}

/// Topic tags from topic/tag links in the content region and topic meta tags
pub fn extract_topics(document: &Html, region: &ElementRef<'_>) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();

    for link in region.select(&LINKS) {
        let href = link.value().attr("href").unwrap_or_default();
        if !TOPIC_HREF.is_match(href) {
            continue;
        }
        let topic = inline_text(&link);
        if !topic.is_empty() && !topics.contains(&topic) {
            topics.push(topic);
        }
    }

    for meta in document.select(&META_PROPERTY) {
        let property = meta.value().attr("property").unwrap_or_default();
        if !TOPIC_PROPERTY.is_match(property) {
            continue;
        }
        let content = meta.value().attr("content").unwrap_or_default().trim();
        if !content.is_empty() && !topics.iter().any(|t| t == content) {
            topics.push(content.to_string());
        }
    }

    topics
}

/// Version tags from version links, then from explicit mentions in the text
pub fn extract_versions(region: &ElementRef<'_>) -> Vec<String> {
    let mut versions: Vec<String> = Vec::new();
    let mut add = |version: &str| {
        if !versions.iter().any(|v| v == version) {
            versions.push(version.to_string());
        }
    };

    for link in region.select(&LINKS) {
        let href = link.value().attr("href").unwrap_or_default();
        if !VERSION_HREF.is_match(href) {
            continue;
        }
        if let Some(version) = VERSION_IN_LINK
            .captures(&inline_text(&link))
            .and_then(|caps| caps.get(1))
        {
            add(version.as_str());
        }
    }

    let text = inline_text(region);
    for caps in VERSION_IN_TEXT.captures_iter(&text) {
        if let Some(version) = caps.get(1).or_else(|| caps.get(2)) {
            add(version.as_str());
        }
    }

    versions
}

/// A prose section located by its heading
pub struct Section<'a> {
    pub heading: ElementRef<'a>,
    pub text: String,
}

/// Finds the first heading containing `name` (case-insensitively) that has
/// content, and renders that content as plain text
pub fn find_section<'a>(region: &ElementRef<'a>, name: &str) -> Option<Section<'a>> {
    let needle = name.to_lowercase();

    region
        .select(&HEADINGS)
        .filter(|heading| inline_text(heading).to_lowercase().contains(&needle))
        .find_map(|heading| {
            let text = section_text(&heading);
            (!text.is_empty()).then_some(Section { heading, text })
        })
}

/// A heading followed by a list, as used for prerequisites and resources
pub struct ListSection<'a> {
    pub heading: ElementRef<'a>,
    pub list: ElementRef<'a>,
}

/// Finds the first `h2`/`h3` containing `keyword` and the list that follows it
/// within its section
pub fn find_list_section<'a>(region: &ElementRef<'a>, keyword: &str) -> Option<ListSection<'a>> {
    let heading = region
        .select(&LIST_HEADINGS)
        .find(|heading| inline_text(heading).to_lowercase().contains(keyword))?;

    let level = heading_level(&heading)?;
    let list = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| heading_level(el).map_or(true, |l| l > level))
        .find(|el| matches!(el.value().name(), "ul" | "ol"))?;

    Some(ListSection { heading, list })
}

/// First link of each direct list item, as `(text, href)`
fn list_links<'a>(list: &ElementRef<'a>) -> Vec<(String, Option<&'a str>)> {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|item| item.value().name() == "li")
        .filter_map(|item| item.select(&LINKS).next().or_else(|| first_anchor(&item)))
        .map(|link| (inline_text(&link), link.value().attr("href")))
        .filter(|(text, _)| !text.is_empty())
        .collect()
}

fn first_anchor<'a>(item: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    item.descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")
}

/// Display names of the prerequisite tutorials
pub fn prerequisites(section: &ListSection<'_>) -> Vec<String> {
    list_links(&section.list)
        .into_iter()
        .map(|(text, _)| text)
        .collect()
}

/// Additional resource links, resolved against the page URL
pub fn additional_resources(section: &ListSection<'_>, page_url: &Url) -> Vec<ResourceLink> {
    list_links(&section.list)
        .into_iter()
        .filter_map(|(text, href)| {
            let url = resolve_link(href?, page_url)?;
            Some(ResourceLink {
                text,
                url: url.to_string(),
            })
        })
        .collect()
}

/// Outer HTML of the content region without chrome and claimed sections
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `region` - The content region inside `document`
/// * `claimed` - Headings whose sections were extracted separately
pub fn main_content(document: &Html, region: &ElementRef<'_>, claimed: &[ElementRef<'_>]) -> String {
    let mut to_remove: Vec<NodeId> = region.select(&CHROME).map(|el| el.id()).collect();
    for heading in claimed {
        to_remove.push(heading.id());
        to_remove.extend(section_siblings(heading).iter().map(|part| part.id()));
    }

    let mut pruned = document.clone();
    for id in to_remove {
        if let Some(mut node) = pruned.tree.get_mut(id) {
            node.detach();
        }
    }

    pruned
        .tree
        .get(region.id())
        .and_then(ElementRef::wrap)
        .map(|el| el.html())
        .unwrap_or_default()
}

/// Plain text of everything under a heading, one line per text run
fn section_text(heading: &ElementRef<'_>) -> String {
    section_siblings(heading)
        .iter()
        .map(|part| part.text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
