//! Integration tests for the crawler
//!
//! These tests drive the full crawl cycle through a scripted page fetcher,
//! and use wiremock to serve media files.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tutorial_vault::browser::{FetchError, FetchResult, PageFetcher};
use tutorial_vault::config::{Config, WaitCondition};
use tutorial_vault::document::ArchiveDocument;
use tutorial_vault::progress::ProgressState;
use tutorial_vault::{Crawler, ProgressStore, VaultError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DELAY_MS: u64 = 50;

/// Serves canned pages; URLs without a page time out
///
/// URLs in `behind_overlay` first render their `pages` entry as a
/// verification overlay; the overlay clears into the `behind_overlay` markup.
struct ScriptedFetcher {
    pages: HashMap<String, String>,
    behind_overlay: HashMap<String, String>,
    visits: Mutex<Vec<(String, Instant)>>,
    current_url: Mutex<String>,
    current: Mutex<String>,
}

impl ScriptedFetcher {
    fn new(pages: HashMap<String, String>) -> Self {
        Self {
            pages,
            behind_overlay: HashMap::new(),
            visits: Mutex::new(Vec::new()),
            current_url: Mutex::new(String::new()),
            current: Mutex::new(String::new()),
        }
    }

    fn with_overlay(mut self, url: &str, cleared: String) -> Self {
        self.behind_overlay.insert(url.to_string(), cleared);
        self
    }

    fn visited(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    fn visit_times(&self) -> Vec<Instant> {
        self.visits.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn navigate(
        &self,
        url: &str,
        _wait: WaitCondition,
        timeout: Duration,
    ) -> FetchResult<String> {
        self.visits
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        match self.pages.get(url) {
            Some(html) => {
                *self.current_url.lock().unwrap() = url.to_string();
                *self.current.lock().unwrap() = html.clone();
                Ok(html.clone())
            }
            None => Err(FetchError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn wait_for_interstitial(&self, _timeout: Duration) -> bool {
        let url = self.current_url.lock().unwrap().clone();
        match self.behind_overlay.get(&url) {
            Some(cleared) => {
                *self.current.lock().unwrap() = cleared.clone();
                true
            }
            None => false,
        }
    }

    async fn content(&self) -> FetchResult<String> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn import_cookies(&self, _path: &Path) -> usize {
        0
    }

    async fn export_cookies(&self, _path: &Path) -> FetchResult<usize> {
        Ok(0)
    }

    async fn close(&mut self) -> FetchResult<()> {
        Ok(())
    }
}

/// Creates a test configuration rooted in `vault`
fn create_test_config(base_url: &str, vault: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.output.vault_dir = vault.to_path_buf();
    config.crawler.delay_ms = DELAY_MS;
    config.crawler.scrape_standalone = false;
    config
}

fn guide_listing_page() -> String {
    r#"<html><body><main>
        <h2>Guides</h2>
        <a href="/guide/views">Views Guide</a>
    </main></body></html>"#
        .to_string()
}

fn guide_page() -> String {
    r#"<html><body>
        <nav><a href="/tutorial/unrelated">Unrelated</a></nav>
        <main>
          <h1>Views Guide</h1>
          <div class="guide-overview"><p>Build listings with Views.</p></div>
          <h2>Tutorials</h2>
          <ul>
            <li><a href="/tutorial/broken-tutorial">Broken Tutorial</a></li>
            <li><a href="/tutorial/working-tutorial">Working Tutorial</a></li>
          </ul>
        </main>
    </body></html>"#
        .to_string()
}

fn tutorial_page(title: &str, body: &str) -> String {
    format!(
        r#"<html><head><title>{title} | Drupalize.Me</title></head><body>
        <main>
          <h1>{title}</h1>
          <a href="/topic/views">Views</a>
          <h2>Goal</h2>
          <p>Learn {title}.</p>
          <h2>Steps</h2>
          {body}
        </main>
        </body></html>"#
    )
}

/// Pages for one guide with two tutorials; the first tutorial is left out
/// unless `include_broken` is set
fn site_pages(config: &Config, include_broken: bool) -> HashMap<String, String> {
    let base = config.base_url().unwrap();
    let mut pages = HashMap::new();
    pages.insert(config.guide_listing_url().unwrap().to_string(), guide_listing_page());
    pages.insert(base.join("/guide/views").unwrap().to_string(), guide_page());
    pages.insert(
        base.join("/tutorial/working-tutorial").unwrap().to_string(),
        tutorial_page("Working Tutorial", "<p>It works.</p>"),
    );
    if include_broken {
        pages.insert(
            base.join("/tutorial/broken-tutorial").unwrap().to_string(),
            tutorial_page("Broken Tutorial", "<p>Fixed now.</p>"),
        );
    }
    pages
}

fn read_progress(vault: &Path) -> ProgressState {
    let text = std::fs::read_to_string(vault.join("_metadata").join("progress.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn guide_index(vault: &Path) -> String {
    std::fs::read_to_string(vault.join("Guides").join("Views Guide").join("_index.md")).unwrap()
}

#[tokio::test]
async fn test_failed_tutorial_does_not_stop_guide() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("https://drupalize.test", dir.path());
    let fetcher = ScriptedFetcher::new(site_pages(&config, false));

    let mut crawler = Crawler::new(config, fetcher).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.tutorials_archived, 1);
    assert_eq!(summary.tutorials_failed, 1);
    assert!(!summary.interrupted);

    // The index lists only what was archived
    let index = guide_index(dir.path());
    assert!(index.starts_with("# Views Guide\n\nBuild listings with Views.\n"));
    assert!(index.contains("- [[Working Tutorial]]"));
    assert!(!index.contains("Broken"));

    let progress = read_progress(dir.path());
    assert_eq!(
        progress.completed_tutorials,
        vec!["https://drupalize.test/tutorial/working-tutorial".to_string()]
    );
    assert_eq!(progress.failed_tutorials.len(), 1);
    assert_eq!(
        progress.failed_tutorials[0].url,
        "https://drupalize.test/tutorial/broken-tutorial"
    );
    assert!(progress.failed_tutorials[0].error.contains("timed out"));
    assert!(progress.completed_guides.is_empty());

    let doc = ArchiveDocument::read(
        &dir.path()
            .join("Guides")
            .join("Views Guide")
            .join("Working Tutorial.md"),
    )
    .unwrap();
    assert_eq!(doc.header.guide.as_deref(), Some("Views Guide"));
    assert_eq!(doc.header.order, Some(2));
    assert!(doc.body.contains("## Goal\n\nLearn Working Tutorial."));
    assert!(doc.body.contains("It works."));

    let topic = std::fs::read_to_string(dir.path().join("Topics").join("Views.md")).unwrap();
    assert!(topic.contains("- [[Working Tutorial]] (Views Guide)"));
}

#[tokio::test]
async fn test_navigations_respect_delay() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("https://drupalize.test", dir.path());
    let fetcher = ScriptedFetcher::new(site_pages(&config, false));

    let mut crawler = Crawler::new(config, fetcher).unwrap();
    crawler.run().await.unwrap();

    let visited = crawler.fetcher().visited();
    assert_eq!(visited.len(), 4);
    assert_eq!(visited[1], "https://drupalize.test/guide/views");
    assert_eq!(visited[2], "https://drupalize.test/tutorial/broken-tutorial");
    assert_eq!(visited[3], "https://drupalize.test/tutorial/working-tutorial");

    let times = crawler.fetcher().visit_times();
    for pair in times.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(DELAY_MS));
    }
}

#[tokio::test]
async fn test_completed_work_is_not_fetched_again() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("https://drupalize.test", dir.path());

    let fetcher = ScriptedFetcher::new(site_pages(&config, true));
    let mut crawler = Crawler::new(config.clone(), fetcher).unwrap();
    let first = crawler.run().await.unwrap();
    assert_eq!(first.tutorials_archived, 2);
    assert_eq!(first.guides_completed, 1);
    assert!(crawler.progress().is_guide_done("https://drupalize.test/guide/views"));

    let fetcher = ScriptedFetcher::new(site_pages(&config, true));
    let mut crawler = Crawler::new(config.clone(), fetcher).unwrap();
    let second = crawler.run().await.unwrap();

    assert_eq!(second.guides_skipped, 1);
    assert_eq!(second.tutorials_archived, 0);
    assert_eq!(
        crawler.fetcher().visited(),
        vec![config.guide_listing_url().unwrap().to_string()]
    );
}

#[tokio::test]
async fn test_resumed_guide_retries_only_failures() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("https://drupalize.test", dir.path());

    let fetcher = ScriptedFetcher::new(site_pages(&config, false));
    let mut crawler = Crawler::new(config.clone(), fetcher).unwrap();
    crawler.run().await.unwrap();

    let fetcher = ScriptedFetcher::new(site_pages(&config, true));
    let mut crawler = Crawler::new(config, fetcher).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.tutorials_archived, 1);
    assert_eq!(summary.tutorials_skipped, 1);
    assert_eq!(summary.guides_completed, 1);

    let visited = crawler.fetcher().visited();
    assert!(visited.contains(&"https://drupalize.test/tutorial/broken-tutorial".to_string()));
    assert!(!visited.contains(&"https://drupalize.test/tutorial/working-tutorial".to_string()));

    // Earlier work still shows up in the rebuilt index, in listing order
    let index = guide_index(dir.path());
    let broken = index.find("[[Broken Tutorial]]").unwrap();
    let working = index.find("[[Working Tutorial]]").unwrap();
    assert!(broken < working);

    let progress = read_progress(dir.path());
    assert!(progress.failed_tutorials.is_empty());
    assert_eq!(progress.completed_tutorials.len(), 2);
}

#[tokio::test]
async fn test_shared_image_is_downloaded_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/shared.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let image = r#"<p><img src="/files/shared.png" alt="shared"></p>"#;

    let base = config.base_url().unwrap();
    let mut pages = HashMap::new();
    pages.insert(config.guide_listing_url().unwrap().to_string(), guide_listing_page());
    pages.insert(base.join("/guide/views").unwrap().to_string(), guide_page());
    pages.insert(
        base.join("/tutorial/broken-tutorial").unwrap().to_string(),
        tutorial_page("Broken Tutorial", image),
    );
    pages.insert(
        base.join("/tutorial/working-tutorial").unwrap().to_string(),
        tutorial_page("Working Tutorial", image),
    );

    let mut crawler = Crawler::new(config, ScriptedFetcher::new(pages)).unwrap();
    let summary = crawler.run().await.unwrap();
    assert_eq!(summary.tutorials_archived, 2);

    let images: Vec<_> = std::fs::read_dir(dir.path().join("assets").join("images"))
        .unwrap()
        .collect();
    assert_eq!(images.len(), 1);
    assert!(dir.path().join("assets/images/shared.png").exists());

    for title in ["Broken Tutorial", "Working Tutorial"] {
        let text = std::fs::read_to_string(
            dir.path()
                .join("Guides")
                .join("Views Guide")
                .join(format!("{}.md", title)),
        )
        .unwrap();
        assert!(text.contains("](../../assets/images/shared.png)"));
    }
}

#[tokio::test]
async fn test_standalone_pass() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config("https://drupalize.test", dir.path());
    config.crawler.scrape_standalone = true;
    config.crawler.delay_ms = 0;

    let mut pages = site_pages(&config, true);
    pages.insert(
        config.tutorial_listing_url().unwrap().to_string(),
        r#"<html><body><main>
            <a href="/tutorial/working-tutorial">Working Tutorial</a>
            <a href="/tutorial/composer-basics">Composer Basics</a>
        </main></body></html>"#
            .to_string(),
    );
    pages.insert(
        "https://drupalize.test/tutorial/composer-basics".to_string(),
        tutorial_page("Composer Basics", "<p>Run composer.</p>"),
    );

    let mut crawler = Crawler::new(config, ScriptedFetcher::new(pages)).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.tutorials_archived, 3);
    assert_eq!(summary.tutorials_skipped, 1);

    let standalone = dir.path().join("Tutorials");
    assert!(standalone.join("Composer Basics.md").exists());
    assert!(!standalone.join("Working Tutorial.md").exists());

    let index = std::fs::read_to_string(standalone.join("_index.md")).unwrap();
    assert!(index.contains("- [[Composer Basics]]"));
    assert!(!index.contains("Working Tutorial"));

    let topic = std::fs::read_to_string(dir.path().join("Topics").join("Views.md")).unwrap();
    assert!(topic.contains("- [[Composer Basics]] (Standalone)"));
    assert!(topic.contains("- [[Working Tutorial]] (Views Guide)"));
}

#[tokio::test]
async fn test_tutorial_is_read_after_overlay_clears() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config("https://drupalize.test", dir.path());
    config.crawler.interstitial_settle_ms = 10;

    let working = "https://drupalize.test/tutorial/working-tutorial";
    let mut pages = site_pages(&config, true);
    pages.insert(
        working.to_string(),
        r#"<html><head><title>Just a moment...</title></head><body>
            <main><h1>Checking your browser</h1><p>Please wait.</p></main>
        </body></html>"#
            .to_string(),
    );
    let fetcher = ScriptedFetcher::new(pages)
        .with_overlay(working, tutorial_page("Working Tutorial", "<p>It works.</p>"));

    let mut crawler = Crawler::new(config, fetcher).unwrap();
    let summary = crawler.run().await.unwrap();
    assert_eq!(summary.tutorials_archived, 2);

    let guide_dir = dir.path().join("Guides").join("Views Guide");
    let doc = ArchiveDocument::read(&guide_dir.join("Working Tutorial.md")).unwrap();
    assert_eq!(doc.header.title, "Working Tutorial");
    assert!(doc.body.contains("It works."));
    assert!(!doc.body.contains("Checking your browser"));
    assert!(!guide_dir.join("Checking your browser.md").exists());
}

#[tokio::test]
async fn test_progress_write_failure_aborts_run() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config("https://drupalize.test", dir.path());

    // A directory where the progress file should be can be read as empty
    // but never replaced
    std::fs::create_dir_all(dir.path().join("_metadata").join("progress.json")).unwrap();

    let fetcher = ScriptedFetcher::new(site_pages(&config, true));
    let mut crawler = Crawler::new(config, fetcher).unwrap();
    let result = crawler.run().await;

    assert!(matches!(result, Err(VaultError::Progress(_))));

    // The run stopped at the first tutorial
    let visited = crawler.fetcher().visited();
    assert_eq!(
        visited.last().map(String::as_str),
        Some("https://drupalize.test/tutorial/broken-tutorial")
    );
    assert!(!dir
        .path()
        .join("Guides")
        .join("Views Guide")
        .join("_index.md")
        .exists());
}
