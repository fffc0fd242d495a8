//! Link discovery on listing and guide pages

use crate::extract::markup::{block_text, heading_level, inline_text, main_region, resolve_link};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static OVERVIEW: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div[class]").expect("OVERVIEW: hardcoded selector is valid")
});

static PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("PARAGRAPHS: hardcoded selector is valid"));

static WALK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h2, h3, h4, a[href]").expect("WALK: hardcoded selector is valid")
});

/// Headings that label a list rather than name a subsection
const GENERIC_HEADINGS: &[&str] = &["tutorials", "lessons", "content"];

/// A link found on a listing page; its text is the display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLink {
    pub name: String,
    pub url: String,
    /// Nearest preceding section heading, on guide pages
    pub subsection: Option<String>,
}

/// Collects same-site links whose path starts with `path_prefix`
///
/// Links are returned in document order, deduplicated by URL; a link with
/// empty text (an image link, say) does not claim its URL. Fragments are
/// dropped.
///
/// # Arguments
///
/// * `html` - The listing page markup
/// * `base_url` - Site base URL, used for resolution and the same-host check
/// * `path_prefix` - Required path prefix, e.g. `/guide/`
/// * `scope_to_main` - Only look inside the page's content region
pub fn discover_links(
    html: &str,
    base_url: &Url,
    path_prefix: &str,
    scope_to_main: bool,
) -> Vec<ListingLink> {
    let document = Html::parse_document(html);
    let scope = if scope_to_main {
        main_region(&document)
    } else {
        document.root_element()
    };

    let mut links: Vec<ListingLink> = Vec::new();
    let mut subsection: Option<String> = None;

    for element in scope.select(&WALK) {
        if heading_level(&element).is_some() {
            subsection = subsection_name(&element);
            continue;
        }

        let Some(mut url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };
        if url.host_str() != base_url.host_str() || !url.path().starts_with(path_prefix) {
            continue;
        }
        url.set_fragment(None);

        let name = inline_text(&element);
        let url = url.to_string();
        if name.is_empty() || links.iter().any(|l| l.url == url) {
            continue;
        }

        links.push(ListingLink {
            name,
            url,
            subsection: subsection.clone(),
        });
    }

    links
}

fn subsection_name(heading: &ElementRef<'_>) -> Option<String> {
    let text = inline_text(heading);
    if text.is_empty() || GENERIC_HEADINGS.contains(&text.to_lowercase().as_str()) {
        None
    } else {
        Some(text)
    }
}

/// Overview text of a guide page
///
/// Uses the first `div` whose class mentions overview, description or intro,
/// else the first non-empty paragraph of the content region.
pub fn guide_overview(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let region = main_region(&document);

    let marked = region.select(&OVERVIEW).find(|div| {
        div.value().classes().any(|class| {
            let class = class.to_lowercase();
            class.contains("overview") || class.contains("description") || class.contains("intro")
        })
    });
    if let Some(text) = marked.map(|div| block_text(&div)).filter(|t| !t.is_empty()) {
        return Some(text);
    }

    region
        .select(&PARAGRAPHS)
        .map(|p| inline_text(&p))
        .find(|t| !t.is_empty())
}
