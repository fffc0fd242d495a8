use crate::layout::{last_segment, sanitize_name};
use crate::media::MediaKind;
use sha2::{Digest, Sha256};
use url::Url;

const MAX_ASSET_NAME: usize = 200;

/// Derives the local file name for an asset URL
///
/// The URL's final path segment is used when it carries a plausible
/// extension; otherwise the first 8 hex digits of the URL's SHA-256 plus the
/// kind's default extension. The query string never contributes.
///
/// # Example
///
/// ```
/// use tutorial_vault::media::{media_filename, MediaKind};
///
/// assert_eq!(
///     media_filename("https://cdn.example.com/img/Hook%20Diagram.png?itok=x", MediaKind::Image),
///     "Hook_Diagram.png"
/// );
/// ```
pub fn media_filename(url: &str, kind: MediaKind) -> String {
    if let Some(name) = path_filename(url) {
        return name;
    }

    let digest = Sha256::digest(url.as_bytes());
    let hash = hex::encode(digest);
    format!("{}.{}", &hash[..8], kind.default_extension())
}

fn path_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = last_segment(&parsed)?;
    let name = segment.replace("%20", " ").replace(' ', "_");

    let (stem, ext) = name.rsplit_once('.')?;
    let plausible = !stem.is_empty()
        && (1..=5).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    if !plausible {
        return None;
    }

    Some(sanitize_name(&name, MAX_ASSET_NAME))
}
