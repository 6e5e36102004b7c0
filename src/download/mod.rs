//! Fetching platform archives from the remote base URL.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::path::Path;

use crate::http::HttpClient;
use crate::platform::PlatformIdentifier;

/// Hosted `Versions/` folder of the project repository.
pub const DEFAULT_BASE_URL: &str =
    "https://media.githubusercontent.com/media/JuliusNixi/CROSS/refs/heads/main/Java/Versions/";

/// Remote location of a platform archive: `<base>/<name>?download=true`.
pub fn artifact_url(base_url: &str, platform: &PlatformIdentifier) -> String {
    format!(
        "{}/{}?download=true",
        base_url.trim_end_matches('/'),
        platform.archive_name()
    )
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Downloader backed by the retrying HTTP client.
pub struct HttpDownloader {
    http_client: HttpClient,
}

impl HttpDownloader {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    #[tracing::instrument(skip(self, dest))]
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        info!("Downloading {} to {:?}...", url, dest);
        let bytes = self
            .http_client
            .download_file(url, || {
                std::fs::File::create(dest)
                    .with_context(|| format!("Failed to create download file at {:?}", dest))
            })
            .await?;
        info!("Download complete.");
        Ok(bytes)
    }
}
