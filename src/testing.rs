//! Deterministic fixture collaborators for tests.
//!
//! These stand in for the network-backed extractor and fetcher so the
//! pipeline can be exercised end-to-end with scripted outcomes: fixed record
//! sets, forced completion orders via per-source delays, and transient or
//! permanent failures. Fetch counts are recorded so tests can assert the
//! one-fetch-per-uid guarantee.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{ContentRecord, Source, ThumbnailRef};
use crate::extract::{ExtractError, Extractor};
use crate::materialize::MediaFetcher;

/// Build a content record with fixture payload fields
pub fn fixture_record(
    uid: &str,
    upload_date: &str,
    playlist_title: &str,
    playlist_index: u32,
    playlist_count: u32,
) -> ContentRecord {
    ContentRecord {
        uid: uid.to_string(),
        title: format!("Mock Entry {}", uid),
        upload_date: NaiveDate::parse_from_str(upload_date, "%Y%m%d").expect("fixture date"),
        playlist_title: playlist_title.to_string(),
        playlist_index,
        playlist_count,
        extractor: "fixture".to_string(),
        ext: "mp4".to_string(),
        description: "The Description".to_string(),
        webpage_url: format!("https://{}.com", uid),
        media_url: format!("https://{}.com/media.mp4", uid),
        thumbnail_url: Some(format!("https://{}.com/thumb.jpg", uid)),
        playlist_thumbnails: Vec::new(),
    }
}

/// Attach channel-style playlist thumbnails to a record
pub fn with_channel_thumbnails(mut record: ContentRecord) -> ContentRecord {
    record.playlist_thumbnails = vec![
        ThumbnailRef {
            id: "avatar_uncropped".to_string(),
            url: "https://avatar_uncropped.com".to_string(),
        },
        ThumbnailRef {
            id: "banner_uncropped".to_string(),
            url: "https://banner_uncropped.com".to_string(),
        },
    ];
    record
}

/// Scripted outcome for one source
enum Script {
    Records(Vec<ContentRecord>),
    Permanent(String),
    /// Fail transiently this many times, then return the records
    TransientThen(u32, Vec<ContentRecord>),
}

/// Extractor returning scripted per-ordinal results
#[derive(Default)]
pub struct FixtureExtractor {
    scripts: HashMap<u32, Script>,
    delays: HashMap<u32, Duration>,
    attempts: Mutex<HashMap<u32, u32>>,
}

impl FixtureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a source to return these records
    pub fn with_records(mut self, ordinal: u32, records: Vec<ContentRecord>) -> Self {
        self.scripts.insert(ordinal, Script::Records(records));
        self
    }

    /// Script a source to fail permanently
    pub fn with_permanent_failure(mut self, ordinal: u32, message: &str) -> Self {
        self.scripts
            .insert(ordinal, Script::Permanent(message.to_string()));
        self
    }

    /// Script a source to fail transiently `failures` times, then succeed
    pub fn with_transient_failures(
        mut self,
        ordinal: u32,
        failures: u32,
        records: Vec<ContentRecord>,
    ) -> Self {
        self.scripts
            .insert(ordinal, Script::TransientThen(failures, records));
        self
    }

    /// Delay a source's completion, to force a completion order
    pub fn with_delay(mut self, ordinal: u32, delay: Duration) -> Self {
        self.delays.insert(ordinal, delay);
        self
    }

    /// How many extraction attempts a source has seen
    pub fn attempts(&self, ordinal: u32) -> u32 {
        *self.attempts.lock().unwrap().get(&ordinal).unwrap_or(&0)
    }
}

#[async_trait]
impl Extractor for FixtureExtractor {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn extract(&self, source: &Source) -> Result<Vec<ContentRecord>, ExtractError> {
        let ordinal = source.ordinal;

        if let Some(delay) = self.delays.get(&ordinal) {
            tokio::time::sleep(*delay).await;
        }

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry(ordinal).or_insert(0);
            *counter += 1;
            *counter
        };

        match self.scripts.get(&ordinal) {
            None => Ok(Vec::new()),
            Some(Script::Records(records)) => Ok(records.clone()),
            Some(Script::Permanent(message)) => Err(ExtractError::Permanent {
                ordinal,
                message: message.clone(),
            }),
            Some(Script::TransientThen(failures, records)) => {
                if attempt <= *failures {
                    Err(ExtractError::Transient {
                        ordinal,
                        message: format!("simulated transient failure {}", attempt),
                    })
                } else {
                    Ok(records.clone())
                }
            }
        }
    }
}

/// Fetcher that writes placeholder bytes and counts fetches per uid
#[derive(Default)]
pub struct FixtureFetcher {
    media_fetches: Mutex<HashMap<String, u32>>,
    thumbnail_fetches: Mutex<HashMap<String, u32>>,
    failing_uids: Mutex<HashMap<String, u32>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make media fetches for `uid` fail `failures` times before succeeding.
    /// Use `u32::MAX` for a uid that never succeeds.
    pub fn fail_media(&self, uid: &str, failures: u32) {
        self.failing_uids
            .lock()
            .unwrap()
            .insert(uid.to_string(), failures);
    }

    /// Number of media fetches performed for a uid
    pub fn media_fetch_count(&self, uid: &str) -> u32 {
        *self.media_fetches.lock().unwrap().get(uid).unwrap_or(&0)
    }

    /// Total media fetches across all uids
    pub fn total_media_fetches(&self) -> u32 {
        self.media_fetches.lock().unwrap().values().sum()
    }

    /// Number of thumbnail fetches performed for a URL
    pub fn thumbnail_fetch_count(&self, url: &str) -> u32 {
        *self.thumbnail_fetches.lock().unwrap().get(url).unwrap_or(&0)
    }
}

#[async_trait]
impl MediaFetcher for FixtureFetcher {
    async fn fetch_media(&self, record: &ContentRecord, dest: &Path) -> Result<()> {
        {
            let mut fetches = self.media_fetches.lock().unwrap();
            *fetches.entry(record.uid.clone()).or_insert(0) += 1;
        }

        {
            let mut failing = self.failing_uids.lock().unwrap();
            if let Some(remaining) = failing.get_mut(&record.uid) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    anyhow::bail!("simulated media fetch failure for {}", record.uid);
                }
            }
        }

        tokio::fs::write(dest, format!("media:{}", record.uid)).await?;
        Ok(())
    }

    async fn fetch_thumbnail(&self, url: &str, dest: &Path) -> Result<bool> {
        {
            let mut fetches = self.thumbnail_fetches.lock().unwrap();
            *fetches.entry(url.to_string()).or_insert(0) += 1;
        }

        tokio::fs::write(dest, format!("image:{}", url)).await?;
        Ok(true)
    }
}
