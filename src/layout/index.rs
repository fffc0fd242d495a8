//! Index document rendering
//!
//! Indexes are pure functions of their input, so regenerating one from the
//! same entries always produces the same bytes.

use std::collections::BTreeMap;

/// A tutorial as it appears in an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialEntry {
    /// Display title
    pub title: String,
    /// File stem of the tutorial document, the target of the wiki link
    pub link: String,
    pub subsection: Option<String>,
    /// 1-based listing position
    pub order: u32,
    pub url: String,
}

/// A guide and the tutorials archived for it so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuideRecord {
    pub name: String,
    pub url: String,
    pub overview: Option<String>,
    pub tutorials: Vec<TutorialEntry>,
}

/// A tutorial listed on a topic page
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TopicEntry {
    /// Owning guide, or `None` for standalone tutorials
    pub guide: Option<String>,
    pub order: u32,
    pub title: String,
    pub link: String,
}

/// Formats a wiki link, aliasing when the file stem differs from the title
pub fn wiki_link(link: &str, title: &str) -> String {
    if link == title {
        format!("[[{}]]", link)
    } else {
        format!("[[{}|{}]]", link, title)
    }
}

/// Renders a guide's `_index.md`
///
/// Tutorials are ordered by listing position and grouped under their
/// subsection headings in order of first appearance; tutorials without a
/// subsection come first.
pub fn render_guide_index(guide: &GuideRecord) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", guide.name));
    if let Some(overview) = guide.overview.as_deref().filter(|o| !o.trim().is_empty()) {
        md.push_str(&format!("{}\n\n", overview.trim()));
    }
    md.push_str("## Tutorials\n\n");

    let mut tutorials: Vec<&TutorialEntry> = guide.tutorials.iter().collect();
    tutorials.sort_by_key(|t| t.order);

    let mut groups: Vec<(Option<&str>, Vec<&TutorialEntry>)> = Vec::new();
    for tutorial in tutorials {
        let key = tutorial.subsection.as_deref();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, items)) => items.push(tutorial),
            None => groups.push((key, vec![tutorial])),
        }
    }
    groups.sort_by_key(|(key, _)| key.is_some());

    for (subsection, items) in groups {
        if let Some(subsection) = subsection {
            md.push_str(&format!("### {}\n\n", subsection));
        }
        for tutorial in items {
            md.push_str(&format!("- {}\n", wiki_link(&tutorial.link, &tutorial.title)));
        }
        md.push('\n');
    }

    md
}

/// Renders `Topics/<topic>.md`
pub fn render_topic_index(topic: &str, entries: &[TopicEntry]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", topic));
    md.push_str(&format!("All tutorials related to **{}**.\n\n", topic));
    md.push_str("## Tutorials\n\n");

    let mut sorted: Vec<&TopicEntry> = entries.iter().collect();
    sorted.sort();
    sorted.dedup();

    for entry in sorted {
        let link = wiki_link(&entry.link, &entry.title);
        match &entry.guide {
            Some(guide) => md.push_str(&format!("- {} ({})\n", link, guide)),
            None => md.push_str(&format!("- {} (Standalone)\n", link)),
        }
    }

    md
}

/// Renders the standalone `Tutorials/_index.md`
pub fn render_standalone_index(entries: &[TutorialEntry]) -> String {
    let mut md = String::new();

    md.push_str("# Standalone Tutorials\n\n");
    md.push_str("Tutorials that do not belong to any guide.\n\n");
    md.push_str("## Tutorials\n\n");

    let mut sorted: Vec<&TutorialEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.link.cmp(&b.link)));

    for entry in sorted {
        md.push_str(&format!("- {}\n", wiki_link(&entry.link, &entry.title)));
    }

    md
}

/// Groups topic entries by topic name
pub fn group_by_topic<I>(tagged: I) -> BTreeMap<String, Vec<TopicEntry>>
where
    I: IntoIterator<Item = (String, TopicEntry)>,
{
    let mut topics: BTreeMap<String, Vec<TopicEntry>> = BTreeMap::new();
    for (topic, entry) in tagged {
        topics.entry(topic).or_default().push(entry);
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, subsection: Option<&str>, order: u32) -> TutorialEntry {
        TutorialEntry {
            title: title.to_string(),
            link: title.to_string(),
            subsection: subsection.map(str::to_string),
            order,
            url: format!("https://example.com/tutorial/{}", order),
        }
    }

    fn create_test_guide() -> GuideRecord {
        GuideRecord {
            name: "Drupal User Guide".to_string(),
            url: "https://example.com/guide/user-guide".to_string(),
            overview: Some("Learn Drupal from the ground up.".to_string()),
            tutorials: vec![
                entry("Installing Drupal", Some("Installation"), 3),
                entry("Concepts", None, 1),
                entry("Planning", Some("Planning"), 2),
                entry("Updating Core", Some("Installation"), 4),
            ],
        }
    }

    #[test]
    fn test_guide_index_layout() {
        let md = render_guide_index(&create_test_guide());
        let expected = "# Drupal User Guide\n\n\
            Learn Drupal from the ground up.\n\n\
            ## Tutorials\n\n\
            - [[Concepts]]\n\n\
            ### Planning\n\n\
            - [[Planning]]\n\n\
            ### Installation\n\n\
            - [[Installing Drupal]]\n\
            - [[Updating Core]]\n\n";
        assert_eq!(md, expected);
    }

    #[test]
    fn test_guide_index_is_idempotent() {
        let guide = create_test_guide();
        assert_eq!(render_guide_index(&guide), render_guide_index(&guide));
    }

    #[test]
    fn test_aliased_link() {
        assert_eq!(wiki_link("Views_ Part 1", "Views: Part 1"), "[[Views_ Part 1|Views: Part 1]]");
        assert_eq!(wiki_link("Views", "Views"), "[[Views]]");
    }

    #[test]
    fn test_topic_index_sorted_and_deduplicated() {
        let a = TopicEntry {
            guide: Some("Guide B".to_string()),
            order: 1,
            title: "Beta".to_string(),
            link: "Beta".to_string(),
        };
        let b = TopicEntry {
            guide: Some("Guide A".to_string()),
            order: 2,
            title: "Alpha".to_string(),
            link: "Alpha".to_string(),
        };
        let c = TopicEntry {
            guide: None,
            order: 0,
            title: "Gamma".to_string(),
            link: "Gamma".to_string(),
        };

        let md = render_topic_index("Views", &[a.clone(), b.clone(), c.clone(), a.clone()]);
        assert!(md.starts_with("# Views\n\nAll tutorials related to **Views**.\n\n## Tutorials\n\n"));
        assert!(md.ends_with(
            "- [[Gamma]] (Standalone)\n- [[Alpha]] (Guide A)\n- [[Beta]] (Guide B)\n"
        ));
        assert_eq!(md, render_topic_index("Views", &[c, b, a]));
    }

    #[test]
    fn test_standalone_index() {
        let md = render_standalone_index(&[entry("Zeta", None, 0), entry("Alpha", None, 0)]);
        assert!(md.ends_with("- [[Alpha]]\n- [[Zeta]]\n"));
    }
}
