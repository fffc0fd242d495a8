//! Name normalization shared by every part of the archive
//!
//! There is exactly one way to turn a slug into a title and one way to turn
//! a title into a file name; everything else calls these.

use url::Url;

/// Characters that are invalid in file or directory names on common platforms
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Title-cased words that should be spelled differently
const ACRONYMS: &[(&str, &str)] = &[
    ("Api", "API"),
    ("Css", "CSS"),
    ("Html", "HTML"),
    ("Php", "PHP"),
    ("Sql", "SQL"),
    ("Ui", "UI"),
    ("Url", "URL"),
    ("Json", "JSON"),
    ("Xml", "XML"),
    ("Ddev", "DDEV"),
    ("Oauth", "OAuth"),
    ("Jsonapi", "JSON:API"),
    ("Graphql", "GraphQL"),
];

/// Makes a name safe to use as a file or directory name
///
/// Invalid characters and control characters become `_`, leading and trailing
/// spaces and dots are removed, and the result is cut to `max_len` characters.
///
/// # Arguments
///
/// * `name` - The display name
/// * `max_len` - Longest allowed result, in characters
///
/// # Returns
///
/// A non-empty name; `untitled` if nothing usable remains
pub fn sanitize_name(name: &str, max_len: usize) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = trim_edges(&replaced);
    let truncated: String = trimmed.chars().take(max_len).collect();
    let result = trim_edges(&truncated);

    if result.is_empty() {
        "untitled".to_string()
    } else {
        result.to_string()
    }
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c == ' ' || c == '.')
}

/// Converts a URL slug into a readable title
///
/// A trailing `-free` segment is dropped, hyphens and underscores become
/// spaces, each word is capitalized, and known acronyms are restored.
/// A lone `s` left over from an apostrophe (`drupal-s`) rejoins its word.
///
/// # Example
///
/// ```
/// use tutorial_vault::layout::slug_to_title;
///
/// assert_eq!(slug_to_title("understanding-drupal"), "Understanding Drupal");
/// assert_eq!(slug_to_title("rest-api-basics"), "Rest API Basics");
/// ```
pub fn slug_to_title(slug: &str) -> String {
    let slug = slug.trim();
    let slug = match slug
        .strip_suffix("-free")
        .or_else(|| slug.strip_suffix("_free"))
    {
        Some(rest) if !rest.trim_matches(|c| c == '-' || c == '_').is_empty() => rest,
        _ => slug,
    };

    let mut words: Vec<String> = Vec::new();
    for raw in slug.split(|c: char| c == '-' || c == '_' || c.is_whitespace()) {
        if raw.is_empty() {
            continue;
        }
        if raw.eq_ignore_ascii_case("s") {
            if let Some(previous) = words.last_mut() {
                previous.push_str("'s");
                continue;
            }
        }
        words.push(capitalize(raw));
    }

    words
        .into_iter()
        .map(|word| {
            ACRONYMS
                .iter()
                .find(|(from, _)| *from == word)
                .map(|(_, to)| to.to_string())
                .unwrap_or(word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Last non-empty path segment of a URL
pub fn last_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.filter(|s| !s.is_empty()).last()
}

/// Derives a title from the final path segment of a URL
pub fn title_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let title = slug_to_title(last_segment(&parsed)?);
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_invalid_characters() {
        assert_eq!(
            sanitize_name(r#"What is <Drupal>: a "CMS" / framework\ | ? *"#, 200),
            "What is _Drupal__ a _CMS_ _ framework_ _ _ _"
        );
    }

    #[test]
    fn test_sanitize_trims_edges() {
        assert_eq!(sanitize_name("  ..Hidden title.. ", 200), "Hidden title");
        assert_eq!(sanitize_name(" ... ", 200), "untitled");
    }

    #[test]
    fn test_sanitize_length_ceiling() {
        let long = "a".repeat(300);
        assert_eq!(sanitize_name(&long, 200).chars().count(), 200);

        let multibyte = "é".repeat(50);
        assert_eq!(sanitize_name(&multibyte, 16).chars().count(), 16);

        // Truncation must not leave a trailing dot or space behind
        assert_eq!(sanitize_name("abcd. efgh", 6), "abcd");
    }

    #[test]
    fn test_slug_to_title() {
        assert_eq!(slug_to_title("understanding-drupal"), "Understanding Drupal");
        assert_eq!(slug_to_title("intro-to-jsonapi"), "Intro To JSON:API");
        assert_eq!(slug_to_title("oauth-and-graphql"), "OAuth And GraphQL");
        assert_eq!(slug_to_title("set-up-ddev-free"), "Set Up DDEV");
        assert_eq!(slug_to_title("drupal-s-render-api"), "Drupal's Render API");
        assert_eq!(slug_to_title("free"), "Free");
    }

    #[test]
    fn test_free_marker_is_a_whole_segment() {
        assert_eq!(slug_to_title("drupal-carefree"), "Drupal Carefree");
        assert_eq!(slug_to_title("hassle_free"), "Hassle");
        assert_eq!(slug_to_title("-free"), "Free");
    }

    #[test]
    fn test_acronyms_are_whole_words() {
        // "Uint" and "Building" must not be touched by the Ui rule
        assert_eq!(slug_to_title("building-uis"), "Building Uis");
        assert_eq!(slug_to_title("ui-patterns"), "UI Patterns");
    }

    #[test]
    fn test_title_from_url() {
        assert_eq!(
            title_from_url("https://drupalize.me/tutorial/user-guide/understanding-drupal")
                .as_deref(),
            Some("Understanding Drupal")
        );
        assert_eq!(
            title_from_url("https://drupalize.me/tutorial/config-api/").as_deref(),
            Some("Config API")
        );
        assert_eq!(title_from_url("https://drupalize.me/"), None);
        assert_eq!(title_from_url("not a url"), None);
    }
}
