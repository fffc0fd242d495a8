//! Image and video URL collection

use crate::extract::markup::{push_unique, resolve_link};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static IMAGES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("IMAGES: hardcoded selector is valid"));

static VIDEOS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("video").expect("VIDEOS: hardcoded selector is valid"));

static SOURCES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("source[src]").expect("SOURCES: hardcoded selector is valid"));

static IFRAMES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe[src]").expect("IFRAMES: hardcoded selector is valid"));

static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("LINKS: hardcoded selector is valid"));

static PLAYER_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)youtube|youtu\.be|vimeo|dailymotion|video")
        .expect("PLAYER_HOST: hardcoded regex is valid")
});

static VIDEO_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(mp4|webm|ogg|ogv|mov|avi|m4v)$").expect("VIDEO_FILE: hardcoded regex is valid")
});

/// Image URLs in document order, lazy-load source preferred
pub fn extract_images(document: &Html, page_url: &Url) -> Vec<String> {
    let mut images = Vec::new();
    for img in document.select(&IMAGES) {
        let src = ["data-src", "src"]
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .find(|value| !value.trim().is_empty());
        if let Some(url) = src.and_then(|src| resolve_link(src, page_url)) {
            push_unique(&mut images, url.to_string());
        }
    }
    images
}

/// Video URLs: `<video>` sources, embedded players, then direct file links
pub fn extract_videos(document: &Html, page_url: &Url) -> Vec<String> {
    let mut videos = Vec::new();

    for video in document.select(&VIDEOS) {
        let own = video.value().attr("src");
        let nested = video.select(&SOURCES).filter_map(|s| s.value().attr("src"));
        for src in own.into_iter().chain(nested) {
            if let Some(url) = resolve_link(src, page_url) {
                push_unique(&mut videos, url.to_string());
            }
        }
    }

    for iframe in document.select(&IFRAMES) {
        let src = iframe.value().attr("src").unwrap_or_default();
        if !PLAYER_HOST.is_match(src) {
            continue;
        }
        if let Some(url) = resolve_link(src, page_url) {
            push_unique(&mut videos, url.to_string());
        }
    }

    for link in document.select(&LINKS) {
        let Some(url) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, page_url))
        else {
            continue;
        };
        if VIDEO_FILE.is_match(url.path()) {
            push_unique(&mut videos, url.to_string());
        }
    }

    videos
}

/// True for a URL that is a video file rather than an embedded player page
pub fn is_video_file(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => VIDEO_FILE.is_match(parsed.path()),
        Err(_) => false,
    }
}

/// True for URLs of hosted players (YouTube, Vimeo, ...) that cannot be
/// downloaded as a file
pub fn is_embedded_player(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or_default();
    !is_video_file(url)
        && ["youtube", "youtu.be", "vimeo", "dailymotion"]
            .iter()
            .any(|player| host.contains(player))
}
