//! Media fetch collaborator.
//!
//! The materializer treats the actual byte transfer as a black box behind
//! this trait: a reqwest-backed implementation for real runs, a fixture
//! implementation for deterministic tests (see `crate::testing`).

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::domain::ContentRecord;

const DEFAULT_USER_AGENT: &str = concat!("medley/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Trait for downloading assets to disk
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download the primary media for a record to `dest`.
    ///
    /// `dest`'s parent directory is guaranteed to exist. Failures may be
    /// retried by the caller; implementations should leave no partial file
    /// behind a returned error if they can avoid it.
    async fn fetch_media(&self, record: &ContentRecord, dest: &Path) -> Result<()>;

    /// Download a thumbnail image to `dest`.
    ///
    /// Returns `Ok(false)` when the source has no usable image at `url`;
    /// thumbnail failures are never fatal to the run.
    async fn fetch_thumbnail(&self, url: &str, dest: &Path) -> Result<bool>;
}

/// Streaming HTTP fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Stream a URL's body to a file on disk
    async fn stream_to_file(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status fetching {}", url))?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("Stream error fetching {}", url))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch_media(&self, record: &ContentRecord, dest: &Path) -> Result<()> {
        let result = self.stream_to_file(&record.media_url, dest).await;

        if result.is_err() {
            // Don't leave a truncated download at the scratch path
            let _ = tokio::fs::remove_file(dest).await;
        }

        result
    }

    async fn fetch_thumbnail(&self, url: &str, dest: &Path) -> Result<bool> {
        match self.stream_to_file(url, dest).await {
            Ok(()) => Ok(true),
            Err(err) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(err)
            }
        }
    }
}
