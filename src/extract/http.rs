//! HTTP/JSON playlist extractor.
//!
//! Fetches a source locator expecting a JSON playlist document and maps its
//! entries to content records. Playlist position and size are stamped from
//! the document itself, so a record carries exactly what its source saw at
//! extraction time.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{ContentRecord, Source, ThumbnailRef};

use super::{ExtractError, Extractor};

const DEFAULT_USER_AGENT: &str = concat!("medley/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw playlist document as served by a source
#[derive(Debug, Deserialize)]
struct PlaylistDoc {
    title: String,
    #[serde(default)]
    thumbnails: Vec<ThumbnailRef>,
    entries: Vec<EntryDoc>,
}

/// Raw playlist entry
#[derive(Debug, Deserialize)]
struct EntryDoc {
    id: String,
    title: String,
    /// Compact date as reported by sources, e.g. "20210808"
    upload_date: String,
    ext: String,
    #[serde(default)]
    extractor: Option<String>,
    #[serde(default)]
    description: String,
    webpage_url: String,
    url: String,
    #[serde(default)]
    thumbnail: Option<String>,
}

/// Extractor backed by an HTTP JSON playlist endpoint
pub struct HttpExtractor {
    client: reqwest::Client,
}

impl Default for HttpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpExtractor {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client }
    }

    fn map_entry(
        entry: EntryDoc,
        playlist_title: &str,
        playlist_thumbnails: &[ThumbnailRef],
        index: usize,
        count: usize,
        ordinal: u32,
    ) -> Result<ContentRecord, ExtractError> {
        let upload_date = NaiveDate::parse_from_str(&entry.upload_date, "%Y%m%d").map_err(
            |e| ExtractError::Permanent {
                ordinal,
                message: format!(
                    "entry '{}' has unparseable upload date '{}': {}",
                    entry.id, entry.upload_date, e
                ),
            },
        )?;

        Ok(ContentRecord {
            uid: entry.id,
            title: entry.title,
            upload_date,
            playlist_title: playlist_title.to_string(),
            playlist_index: (index + 1) as u32,
            playlist_count: count as u32,
            extractor: entry.extractor.unwrap_or_else(|| "http-json".to_string()),
            ext: entry.ext,
            description: entry.description,
            webpage_url: entry.webpage_url,
            media_url: entry.url,
            thumbnail_url: entry.thumbnail,
            playlist_thumbnails: playlist_thumbnails.to_vec(),
        })
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    fn name(&self) -> &str {
        "http-json"
    }

    async fn extract(&self, source: &Source) -> Result<Vec<ContentRecord>, ExtractError> {
        let ordinal = source.ordinal;

        let response = self
            .client
            .get(&source.locator)
            .send()
            .await
            .map_err(|e| classify_request_error(ordinal, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(ordinal, status));
        }

        let doc: PlaylistDoc = response.json().await.map_err(|e| {
            // A 2xx body that fails to decode is a malformed source, not a
            // network hiccup
            ExtractError::Permanent {
                ordinal,
                message: format!("invalid playlist document: {}", e),
            }
        })?;

        debug!(
            ordinal,
            playlist = %doc.title,
            entries = doc.entries.len(),
            "playlist document fetched"
        );

        let count = doc.entries.len();
        doc.entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                Self::map_entry(entry, &doc.title, &doc.thumbnails, i, count, ordinal)
            })
            .collect()
    }
}

fn classify_request_error(ordinal: u32, err: &reqwest::Error) -> ExtractError {
    if err.is_timeout() || err.is_connect() {
        ExtractError::Transient {
            ordinal,
            message: err.to_string(),
        }
    } else {
        ExtractError::Permanent {
            ordinal,
            message: err.to_string(),
        }
    }
}

fn classify_status(ordinal: u32, status: reqwest::StatusCode) -> ExtractError {
    let message = format!(
        "HTTP {}: {}",
        status,
        status.canonical_reason().unwrap_or("Unknown")
    );

    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ExtractError::Transient { ordinal, message }
    } else {
        ExtractError::Permanent { ordinal, message }
    }
}
