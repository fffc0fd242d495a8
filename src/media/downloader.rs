//! Concurrency-bounded asset fetcher

use crate::config::DownloaderConfig;
use crate::media::naming::media_filename;
use crate::media::{DownloadError, DownloadResult, MediaKind};
use futures::future::join_all;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Where each successfully stored asset lives, keyed by source URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPaths {
    pub images: HashMap<String, PathBuf>,
    pub videos: HashMap<String, PathBuf>,
}

/// Builds the HTTP client used for asset transfers
///
/// # Arguments
///
/// * `config` - The downloader configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &DownloaderConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(30))
        .gzip(true)
        .brotli(true)
        .build()
}

/// One destination file and every URL that resolves to it
struct Job {
    kind: MediaKind,
    url: String,
    aliases: Vec<String>,
    dest: PathBuf,
}

/// Downloads tutorial media into the asset directories
pub struct MediaDownloader {
    client: Client,
    semaphore: Arc<Semaphore>,
    images_dir: PathBuf,
    videos_dir: PathBuf,
}

impl MediaDownloader {
    /// Creates a downloader writing into the given directories
    pub fn new(
        config: &DownloaderConfig,
        images_dir: impl Into<PathBuf>,
        videos_dir: impl Into<PathBuf>,
    ) -> DownloadResult<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            images_dir: images_dir.into(),
            videos_dir: videos_dir.into(),
        })
    }

    /// Local path an asset URL is stored at, whether or not it exists yet
    pub fn destination(&self, url: &str, kind: MediaKind) -> PathBuf {
        let dir = match kind {
            MediaKind::Image => &self.images_dir,
            MediaKind::Video => &self.videos_dir,
        };
        dir.join(media_filename(url, kind))
    }

    /// Downloads every image and video, skipping files already on disk
    ///
    /// URLs are grouped by destination before the fan-out, so each file is
    /// written by exactly one transfer. Failed assets are logged and left
    /// out of the result; they never fail the batch.
    ///
    /// # Arguments
    ///
    /// * `images` - Absolute image URLs
    /// * `videos` - Absolute video URLs
    ///
    /// # Returns
    ///
    /// Local paths of the assets that are present after the batch
    pub async fn download_all(&self, images: &[String], videos: &[String]) -> MediaPaths {
        let jobs = self.plan(images, videos);
        debug!("Downloading {} assets", jobs.len());

        let results = join_all(jobs.into_iter().map(|job| self.run_job(job))).await;

        let mut paths = MediaPaths::default();
        for (job, outcome) in results {
            if let Err(e) = outcome {
                warn!("Failed to download {}: {}", job.url, e);
                continue;
            }
            let map = match job.kind {
                MediaKind::Image => &mut paths.images,
                MediaKind::Video => &mut paths.videos,
            };
            for url in job.aliases {
                map.insert(url, job.dest.clone());
            }
            map.insert(job.url, job.dest);
        }
        paths
    }

    fn plan(&self, images: &[String], videos: &[String]) -> Vec<Job> {
        let mut jobs: Vec<Job> = Vec::new();
        let mut by_dest: HashMap<PathBuf, usize> = HashMap::new();

        let tagged = images
            .iter()
            .map(|u| (MediaKind::Image, u))
            .chain(videos.iter().map(|u| (MediaKind::Video, u)));

        for (kind, url) in tagged {
            let dest = self.destination(url, kind);
            match by_dest.get(&dest) {
                Some(&index) => {
                    let job = &mut jobs[index];
                    if job.url != *url && !job.aliases.contains(url) {
                        job.aliases.push(url.clone());
                    }
                }
                None => {
                    by_dest.insert(dest.clone(), jobs.len());
                    jobs.push(Job {
                        kind,
                        url: url.clone(),
                        aliases: Vec::new(),
                        dest,
                    });
                }
            }
        }
        jobs
    }

    async fn run_job(&self, job: Job) -> (Job, DownloadResult<()>) {
        if job.dest.exists() {
            debug!("Already have {}", job.dest.display());
            return (job, Ok(()));
        }

        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                let err = std::io::Error::new(std::io::ErrorKind::Other, "downloader closed");
                return (job, Err(err.into()));
            }
        };

        let outcome = self.fetch_to(&job.url, &job.dest).await;
        (job, outcome)
    }

    /// Streams one URL to disk through a `.part` file
    async fn fetch_to(&self, url: &str, dest: &Path) -> DownloadResult<()> {
        let response = self.client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = dest.with_extension(match dest.extension() {
            Some(ext) => format!("{}.part", ext.to_string_lossy()),
            None => "part".to_string(),
        });

        let written = async {
            let mut file = tokio::fs::File::create(&partial).await?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            Ok::<(), DownloadError>(())
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        tokio::fs::rename(&partial, dest).await?;
        debug!("Saved {}", dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_downloader(dir: &TempDir) -> MediaDownloader {
        MediaDownloader::new(
            &DownloaderConfig::default(),
            dir.path().join("images"),
            dir.path().join("videos"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_download_and_skip_existing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/diagram.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 20_000]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let downloader = create_test_downloader(&dir);
        let url = format!("{}/img/diagram.png", server.uri());

        let first = downloader.download_all(&[url.clone()], &[]).await;
        let stored = first.images.get(&url).unwrap();
        assert_eq!(stored, &dir.path().join("images").join("diagram.png"));
        assert_eq!(std::fs::read(stored).unwrap().len(), 20_000);

        // Second batch finds the file and does not hit the server again
        let second = downloader.download_all(&[url.clone()], &[]).await;
        assert_eq!(second.images.get(&url), Some(stored));
    }

    #[tokio::test]
    async fn test_failed_asset_is_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let downloader = create_test_downloader(&dir);
        let missing = format!("{}/missing.png", server.uri());
        let clip = format!("{}/clip.mp4", server.uri());

        let paths = downloader.download_all(&[missing.clone()], &[clip.clone()]).await;
        assert!(!paths.images.contains_key(&missing));
        assert!(!dir.path().join("images").join("missing.png").exists());
        assert!(!dir.path().join("images").join("missing.png.part").exists());
        assert_eq!(
            paths.videos.get(&clip),
            Some(&dir.path().join("videos").join("clip.mp4"))
        );
    }

    #[tokio::test]
    async fn test_same_destination_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let downloader = create_test_downloader(&dir);
        let plain = format!("{}/a/logo.png", server.uri());
        let versioned = format!("{}/a/logo.png?itok=abc", server.uri());

        let paths = downloader
            .download_all(&[plain.clone(), versioned.clone(), plain.clone()], &[])
            .await;
        assert_eq!(paths.images.len(), 2);
        assert_eq!(paths.images.get(&plain), paths.images.get(&versioned));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_soft_failure() {
        let dir = TempDir::new().unwrap();
        let downloader = create_test_downloader(&dir);
        let paths = downloader
            .download_all(&["http://127.0.0.1:9/nothing.png".to_string()], &[])
            .await;
        assert!(paths.images.is_empty());
    }
}
