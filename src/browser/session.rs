//! Chrome DevTools session
//!
//! Supports attaching to a running browser, launching with a persisted
//! profile, and launching a disposable stealth instance.

use crate::browser::cookies::{read_cookie_file, write_cookie_file, CanonicalCookie};
use crate::browser::stealth::{INIT_SCRIPT, STEALTH_ARGS, TIMEZONE, USER_AGENT};
use crate::browser::{FetchError, FetchResult, PageFetcher};
use crate::config::{BrowserConfig, WaitCondition};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Handler, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How the session obtained its browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Attached to a browser someone else runs; never closed by us
    Attach { endpoint: String },
    /// Launched with an existing user profile
    Profile { dir: PathBuf },
    /// Launched fresh with stealth adjustments
    Disposable,
}

impl ConnectionMode {
    /// Derives the mode from configuration; `cdp_url` wins over `profile_dir`
    pub fn from_config(config: &BrowserConfig) -> Self {
        if let Some(endpoint) = &config.cdp_url {
            ConnectionMode::Attach {
                endpoint: endpoint.clone(),
            }
        } else if let Some(dir) = &config.profile_dir {
            ConnectionMode::Profile { dir: dir.clone() }
        } else {
            ConnectionMode::Disposable
        }
    }
}

/// A controlled browser tab
pub struct BrowserSession {
    browser: Option<Browser>,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
    mode: ConnectionMode,
    owns_browser: bool,
    interstitial_text: String,
}

impl BrowserSession {
    /// Starts a session in the mode the configuration selects
    ///
    /// # Arguments
    ///
    /// * `config` - Browser section of the configuration
    /// * `interstitial_text` - Visible text of the verification overlay
    ///
    /// # Returns
    ///
    /// * `Ok(BrowserSession)` - A session with one usable tab
    /// * `Err(FetchError)` - Attach or launch failed
    pub async fn start(config: &BrowserConfig, interstitial_text: &str) -> FetchResult<Self> {
        let mode = ConnectionMode::from_config(config);

        let (browser, handler, owns_browser) = match &mode {
            ConnectionMode::Attach { endpoint } => {
                info!("Attaching to running browser at {}", endpoint);
                let (browser, handler) = Browser::connect(endpoint.as_str()).await.map_err(|e| {
                    FetchError::AttachFailed {
                        endpoint: endpoint.clone(),
                        message: e.to_string(),
                    }
                })?;
                (browser, handler, false)
            }
            ConnectionMode::Profile { dir } => {
                info!("Launching browser with profile {}", dir.display());
                let builder = base_builder(config, dir.clone());
                let (browser, handler) = launch(builder).await?;
                (browser, handler, true)
            }
            ConnectionMode::Disposable => {
                let dir = config
                    .user_data_dir
                    .clone()
                    .unwrap_or_else(|| std::env::temp_dir().join("tutorial_vault_browser"));
                info!("Launching disposable browser (data dir {})", dir.display());
                let mut builder = base_builder(config, dir)
                    .arg(format!("--user-agent={}", USER_AGENT));
                for arg in STEALTH_ARGS {
                    builder = builder.arg(*arg);
                }
                let (browser, handler) = launch(builder).await?;
                (browser, handler, true)
            }
        };

        let handler_task = spawn_handler(handler);
        let page = open_page(&browser, &mode).await?;

        if mode == ConnectionMode::Disposable {
            apply_stealth(&page).await?;
        }

        let session = Self {
            browser: Some(browser),
            page,
            handler_task: Some(handler_task),
            mode,
            owns_browser,
            interstitial_text: interstitial_text.to_string(),
        };

        if let Some(cookies_file) = &config.cookies_file {
            if session.mode == ConnectionMode::Disposable {
                session.import_cookies(cookies_file).await;
            } else {
                debug!("Ignoring cookies file outside disposable mode");
            }
        }

        Ok(session)
    }

    pub fn mode(&self) -> &ConnectionMode {
        &self.mode
    }

    /// Whether `close` will terminate the browser process
    pub fn owns_browser(&self) -> bool {
        self.owns_browser
    }

    async fn overlay_visible(&self) -> bool {
        let script = format!(
            "document.body ? document.body.innerText.includes({}) : false",
            serde_json::Value::String(self.interstitial_text.clone())
        );
        match self.page.evaluate(script.as_str()).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                trace!("Interstitial check failed: {}", e);
                false
            }
        }
    }

    async fn load(&self, url: &str, wait: WaitCondition) -> FetchResult<String> {
        self.page.goto(url).await.map_err(|e| FetchError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if wait == WaitCondition::NetworkIdle {
            return self.wait_until_stable().await;
        }

        self.content().await
    }

    /// Polls the markup until two consecutive reads agree
    async fn wait_until_stable(&self) -> FetchResult<String> {
        let mut previous = self.content().await?;
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let current = self.content().await?;
            if current == previous {
                return Ok(current);
            }
            previous = current;
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserSession {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> FetchResult<String> {
        debug!("Navigating to {}", url);
        match tokio::time::timeout(timeout, self.load(url, wait)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn wait_for_interstitial(&self, timeout: Duration) -> bool {
        if !self.overlay_visible().await {
            return false;
        }

        info!("Verification overlay detected, waiting up to {:?}", timeout);
        let start = Instant::now();
        while start.elapsed() < timeout {
            tokio::time::sleep(POLL_INTERVAL).await;
            if !self.overlay_visible().await {
                debug!("Overlay cleared after {:.1}s", start.elapsed().as_secs_f64());
                return true;
            }
        }

        warn!("Verification overlay still present after {:?}, continuing", timeout);
        true
    }

    async fn content(&self) -> FetchResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| FetchError::Protocol(e.to_string()))
    }

    async fn import_cookies(&self, path: &Path) -> usize {
        let cookies = match read_cookie_file(path) {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!("Could not import cookies: {}", e);
                return 0;
            }
        };

        let params: Vec<_> = cookies
            .iter()
            .filter_map(|cookie| match cookie.to_param() {
                Ok(param) => Some(param),
                Err(e) => {
                    warn!("Skipping cookie {}: {}", cookie.name, e);
                    None
                }
            })
            .collect();

        if params.is_empty() {
            warn!("No usable cookies in {}", path.display());
            return 0;
        }

        let count = params.len();
        match self.page.set_cookies(params).await {
            Ok(_) => {
                info!("Imported {} cookies", count);
                count
            }
            Err(e) => {
                warn!("Could not import cookies: {}", e);
                0
            }
        }
    }

    async fn export_cookies(&self, path: &Path) -> FetchResult<usize> {
        let cookies: Vec<CanonicalCookie> = self
            .page
            .get_cookies()
            .await
            .map_err(|e| FetchError::Protocol(e.to_string()))?
            .iter()
            .map(CanonicalCookie::from_cdp)
            .collect();

        write_cookie_file(path, &cookies)?;

        info!("Exported {} cookies to {}", cookies.len(), path.display());
        Ok(cookies.len())
    }

    async fn close(&mut self) -> FetchResult<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let result = if self.owns_browser {
            info!("Closing browser");
            match browser.close().await {
                Ok(_) => {
                    if let Err(e) = browser.wait().await {
                        debug!("Browser process wait failed: {}", e);
                    }
                    Ok(())
                }
                Err(e) => Err(FetchError::Protocol(e.to_string())),
            }
        } else {
            info!("Detaching from browser, leaving it running");
            Ok(())
        };

        release_handler(self.handler_task.take(), result)
    }
}

/// Stops the CDP handler task, whatever the outcome of closing the browser
fn release_handler(task: Option<JoinHandle<()>>, closed: FetchResult<()>) -> FetchResult<()> {
    if let Some(task) = task {
        task.abort();
    }
    closed
}

fn base_builder(config: &BrowserConfig, user_data_dir: PathBuf) -> BrowserConfigBuilder {
    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(1920, 1080)
        .user_data_dir(user_data_dir);

    if let Some(executable) = &config.chrome_executable {
        builder = builder.chrome_executable(executable.clone());
    }

    if config.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    }
}

async fn launch(builder: BrowserConfigBuilder) -> FetchResult<(Browser, Handler)> {
    let browser_config = builder.build().map_err(FetchError::Launch)?;
    Browser::launch(browser_config)
        .await
        .map_err(|e| FetchError::Launch(e.to_string()))
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                // chromiumoxide cannot decode every CDP event Chrome emits
                if message.contains("data did not match any variant of untagged enum Message")
                    || message.contains("Failed to deserialize WS response")
                {
                    trace!("Ignoring undecodable CDP message: {}", message);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        debug!("Browser handler task finished");
    })
}

async fn open_page(browser: &Browser, mode: &ConnectionMode) -> FetchResult<Page> {
    // An attached browser already has the user's authenticated tabs open
    if matches!(mode, ConnectionMode::Attach { .. }) {
        if let Ok(pages) = browser.pages().await {
            if let Some(page) = pages.into_iter().next() {
                return Ok(page);
            }
        }
    }

    browser
        .new_page("about:blank")
        .await
        .map_err(|e| FetchError::Protocol(e.to_string()))
}

async fn apply_stealth(page: &Page) -> FetchResult<()> {
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(INIT_SCRIPT))
        .await
        .map_err(|e| FetchError::Protocol(e.to_string()))?;

    if let Err(e) = page
        .execute(SetTimezoneOverrideParams::new(TIMEZONE))
        .await
    {
        debug!("Timezone override rejected: {}", e);
    }
    Ok(())
}
