//! Crawler coordinator - the end-to-end archive loop

use crate::browser::{FetchResult, PageFetcher};
use crate::config::Config;
use crate::convert::{DocumentContext, DocumentConverter};
use crate::crawler::CrawlPhase;
use crate::document::find_by_source;
use crate::extract::{discover_links, guide_overview, ContentExtractor, ListingLink};
use crate::layout::{file_stem, GuideRecord, TutorialEntry, VaultLayout};
use crate::media::{MediaDownloader, MediaKind};
use crate::progress::{JsonProgressStore, ProgressStore};
use crate::VaultError;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

const GUIDE_PATH: &str = "/guide/";
const TUTORIAL_PATH: &str = "/tutorial/";

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub guides_completed: usize,
    pub guides_skipped: usize,
    pub guides_failed: usize,
    pub tutorials_archived: usize,
    pub tutorials_skipped: usize,
    pub tutorials_failed: usize,
    /// The run stopped early on request
    pub interrupted: bool,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "guides: {} completed, {} skipped, {} failed; tutorials: {} archived, {} skipped, {} failed",
            self.guides_completed,
            self.guides_skipped,
            self.guides_failed,
            self.tutorials_archived,
            self.tutorials_skipped,
            self.tutorials_failed
        )
    }
}

/// Result of handing one tutorial link to the crawler
enum TutorialOutcome {
    Archived(TutorialEntry),
    /// Completed in an earlier run; carries its document if one is on disk
    Skipped(Option<TutorialEntry>),
    Failed,
}

/// Drives the whole archive run over a [`PageFetcher`]
pub struct Crawler<F: PageFetcher> {
    config: Config,
    base_url: Url,
    fetcher: F,
    progress: JsonProgressStore,
    layout: VaultLayout,
    extractor: ContentExtractor,
    converter: DocumentConverter,
    downloader: MediaDownloader,
    phase: CrawlPhase,
    summary: CrawlSummary,
    stop: Arc<AtomicBool>,
}

impl<F: PageFetcher> Crawler<F> {
    /// Creates a crawler writing into the configured vault
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `fetcher` - A started page fetcher
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(VaultError)` - The configuration could not be turned into components
    pub fn new(config: Config, fetcher: F) -> crate::Result<Self> {
        let base_url = config.base_url()?;
        let layout = VaultLayout::new(
            config.output.vault_dir.clone(),
            config.output.max_filename_length,
        );
        let progress = JsonProgressStore::new(layout.progress_path());
        let extractor = ContentExtractor::from_config(&config.site)?;
        let converter = DocumentConverter::new(base_url.clone());
        let downloader = MediaDownloader::new(
            &config.downloader,
            layout.assets_dir(MediaKind::Image),
            layout.assets_dir(MediaKind::Video),
        )?;

        Ok(Self {
            config,
            base_url,
            fetcher,
            progress,
            layout,
            extractor,
            converter,
            downloader,
            phase: CrawlPhase::Idle,
            summary: CrawlSummary::default(),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that makes [`run`](Self::run) stop before its next unit of work
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn phase(&self) -> &CrawlPhase {
        &self.phase
    }

    pub fn progress(&self) -> &JsonProgressStore {
        &self.progress
    }

    pub fn layout(&self) -> &VaultLayout {
        &self.layout
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs the full crawl
    ///
    /// Per-tutorial and per-guide failures are recorded and the run moves
    /// on; only progress-store and vault I/O failures abort it.
    pub async fn run(&mut self) -> crate::Result<CrawlSummary> {
        self.summary = CrawlSummary::default();
        self.layout.initialize()?;
        tracing::info!("Archiving {} into {}", self.base_url, self.layout.root().display());

        self.set_phase(CrawlPhase::DiscoveringGuides);
        let guides = self.discover_guides().await?;
        tracing::info!("Found {} guides", guides.len());

        for guide in &guides {
            if self.stop_requested() {
                break;
            }
            self.process_guide(guide).await?;
        }

        if self.config.crawler.scrape_standalone && !self.stop_requested() {
            self.process_standalone().await?;
        }

        let standalone = self.layout.rebuild_standalone_index()?;
        let topics = self.layout.rebuild_topic_indexes()?;
        tracing::info!(
            "Indexed {} standalone tutorials and {} topics",
            standalone,
            topics
        );

        self.summary.interrupted = self.stop_requested();
        self.set_phase(CrawlPhase::Done);
        tracing::info!("Crawl finished: {}", self.summary);

        Ok(self.summary.clone())
    }

    /// Closes the page fetcher
    pub async fn shutdown(mut self) -> Result<(), VaultError> {
        self.fetcher.close().await?;
        Ok(())
    }

    async fn discover_guides(&mut self) -> Result<Vec<ListingLink>, VaultError> {
        let listing = self.config.guide_listing_url()?;
        let html = match self.fetch_page(listing.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Error fetching guide list {}: {}", listing, e);
                self.pause().await;
                return Ok(Vec::new());
            }
        };
        self.pause().await;

        Ok(discover_links(&html, &self.base_url, GUIDE_PATH, false))
    }

    /// Archives one guide and writes its index
    ///
    /// The guide is only marked done when its page was read and every one of
    /// its tutorials is archived, so a guide with failures is retried later.
    async fn process_guide(&mut self, guide: &ListingLink) -> Result<(), VaultError> {
        if self.progress.is_guide_done(&guide.url) {
            tracing::info!("Skipping completed guide: {}", guide.name);
            self.summary.guides_skipped += 1;
            return Ok(());
        }

        self.set_phase(CrawlPhase::ScrapingGuide {
            guide: guide.name.clone(),
        });

        let html = match self.fetch_page(&guide.url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Error scraping guide {} ({}): {}", guide.name, guide.url, e);
                self.summary.guides_failed += 1;
                self.pause().await;
                return Ok(());
            }
        };
        self.pause().await;

        let tutorials = discover_links(&html, &self.base_url, TUTORIAL_PATH, true);
        tracing::info!("Found {} tutorials in {}", tutorials.len(), guide.name);

        let guide_dir = self.layout.guide_dir(&guide.name);
        let mut record = GuideRecord {
            name: guide.name.clone(),
            url: guide.url.clone(),
            overview: guide_overview(&html),
            tutorials: Vec::new(),
        };

        let mut complete = true;
        for (position, link) in tutorials.iter().enumerate() {
            if self.stop_requested() {
                complete = false;
                break;
            }

            let context = DocumentContext {
                guide: Some(guide.name.clone()),
                subsection: link.subsection.clone(),
                order: Some(position as u32 + 1),
            };

            match self.process_tutorial(link, &guide_dir, context).await? {
                TutorialOutcome::Archived(entry) | TutorialOutcome::Skipped(Some(entry)) => {
                    record.tutorials.push(entry)
                }
                TutorialOutcome::Skipped(None) => {}
                TutorialOutcome::Failed => complete = false,
            }
        }

        let index = self.layout.write_guide_index(&record)?;
        tracing::debug!("Wrote {}", index.display());

        if complete {
            self.progress.mark_guide_done(&guide.url)?;
            self.summary.guides_completed += 1;
        } else {
            self.summary.guides_failed += 1;
        }

        Ok(())
    }

    async fn process_standalone(&mut self) -> Result<(), VaultError> {
        self.set_phase(CrawlPhase::ScrapingStandalone);

        let listing = self.config.tutorial_listing_url()?;
        let html = match self.fetch_page(listing.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Error fetching tutorial list {}: {}", listing, e);
                self.pause().await;
                return Ok(());
            }
        };
        self.pause().await;

        let tutorials = discover_links(&html, &self.base_url, TUTORIAL_PATH, false);
        tracing::info!("Found {} standalone tutorials", tutorials.len());

        let dir = self.layout.standalone_dir();
        for link in &tutorials {
            if self.stop_requested() {
                break;
            }
            self.process_tutorial(link, &dir, DocumentContext::default())
                .await?;
        }

        Ok(())
    }

    /// Archives a tutorial unless it is already done
    ///
    /// Archive failures are recorded in the progress store and reported as
    /// [`TutorialOutcome::Failed`]; an error is returned only when the
    /// progress store itself cannot be written.
    async fn process_tutorial(
        &mut self,
        link: &ListingLink,
        parent: &Path,
        context: DocumentContext,
    ) -> Result<TutorialOutcome, VaultError> {
        if self.progress.is_tutorial_done(&link.url) {
            tracing::info!("Skipping completed: {}", link.name);
            self.summary.tutorials_skipped += 1;
            return Ok(TutorialOutcome::Skipped(existing_entry(link, parent, &context)));
        }

        self.set_phase(CrawlPhase::ScrapingTutorial {
            guide: context.guide.clone(),
            tutorial: link.name.clone(),
        });

        let result = self.archive_tutorial(link, parent, &context).await;
        let outcome = match result {
            Ok(entry) => {
                self.progress.mark_tutorial_done(&link.url)?;
                self.summary.tutorials_archived += 1;
                tracing::info!("Archived: {}", entry.title);
                TutorialOutcome::Archived(entry)
            }
            Err(e) => {
                tracing::error!("Error scraping tutorial {} ({}): {}", link.name, link.url, e);
                self.progress.mark_tutorial_failed(&link.url, &e.to_string())?;
                self.summary.tutorials_failed += 1;
                TutorialOutcome::Failed
            }
        };

        self.pause().await;
        Ok(outcome)
    }

    /// Fetch, extract, download, convert and write one tutorial
    async fn archive_tutorial(
        &self,
        link: &ListingLink,
        parent: &Path,
        context: &DocumentContext,
    ) -> Result<TutorialEntry, VaultError> {
        let html = self.fetch_page(&link.url).await?;
        let record = self.extractor.extract(&html, &link.url)?;

        let videos = record.downloadable_videos();
        let media = self.downloader.download_all(&record.images, &videos).await;
        tracing::debug!(
            "{} of {} media files stored for {}",
            media.images.len() + media.videos.len(),
            record.images.len() + videos.len(),
            link.url
        );

        let path = self.layout.tutorial_path(
            parent,
            &record.title,
            context.subsection.as_deref(),
            &record.url,
        );
        let document = self.converter.to_document(&record, &path, context, &media);
        document.write(&path)?;

        Ok(TutorialEntry {
            title: record.title,
            link: file_stem(&path),
            subsection: context.subsection.clone(),
            order: context.order.unwrap_or(0),
            url: record.url,
        })
    }

    /// Navigates and returns the page once any verification overlay cleared
    async fn fetch_page(&self, url: &str) -> FetchResult<String> {
        let crawler = &self.config.crawler;
        let html = self
            .fetcher
            .navigate(url, crawler.wait_until, crawler.navigation_timeout())
            .await?;

        if self
            .fetcher
            .wait_for_interstitial(crawler.interstitial_timeout())
            .await
        {
            tokio::time::sleep(crawler.interstitial_settle()).await;
            return self.fetcher.content().await;
        }

        Ok(html)
    }

    async fn pause(&self) {
        let delay = self.config.crawler.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn set_phase(&mut self, phase: CrawlPhase) {
        tracing::debug!("Phase: {}", phase);
        self.phase = phase;
    }
}

/// Index entry for a tutorial archived in an earlier run
fn existing_entry(
    link: &ListingLink,
    parent: &Path,
    context: &DocumentContext,
) -> Option<TutorialEntry> {
    match find_by_source(parent, &link.url) {
        Ok(Some((path, header))) => Some(TutorialEntry {
            title: header.title,
            link: file_stem(&path),
            subsection: context.subsection.clone().or(header.subsection),
            order: context.order.or(header.order).unwrap_or(0),
            url: link.url.clone(),
        }),
        Ok(None) => {
            tracing::debug!("No archived document for {}", link.url);
            None
        }
        Err(e) => {
            tracing::warn!("Could not scan {} for {}: {}", parent.display(), link.url, e);
            None
        }
    }
}
