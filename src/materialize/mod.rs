//! Idempotent asset materialization.
//!
//! The materializer is the only component that mutates shared state after
//! extraction: the per-run asset map. Access is guarded per uid, so
//! concurrent materialize calls for the same uid collapse into a single
//! fetch with every caller observing the same resulting asset.
//!
//! Media is fetched into a scratch working directory and promoted to its
//! library path only on success, so a failed transfer never leaves a partial
//! file at the destination.

pub mod fetch;
pub mod thumbnail;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use crate::core::retry::RetryPolicy;
use crate::domain::ContentRecord;
use crate::naming::EntryPlan;

pub use fetch::{HttpFetcher, MediaFetcher};
pub use thumbnail::{classify_output_name, ThumbnailRole};

/// On-disk assets for one uid, created at most once per run
#[derive(Debug, Clone)]
pub struct MaterializedAsset {
    /// Content identity
    pub uid: String,

    /// Final path of the primary media file
    pub media_path: PathBuf,

    /// Final path of the entry thumbnail, when one was resolved
    pub thumbnail_path: Option<PathBuf>,
}

/// Materialization failure, attributable to its uid and stage
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("media fetch for '{uid}' failed after {attempts} attempts: {message}")]
    Fetch {
        uid: String,
        attempts: u32,
        message: String,
    },

    #[error("staging '{uid}' into the library failed: {source}")]
    Staging {
        uid: String,
        #[source]
        source: std::io::Error,
    },
}

type AssetCell = Arc<OnceCell<Arc<MaterializedAsset>>>;

/// Materializer with per-uid single-flight fetch
pub struct Materializer<F: MediaFetcher> {
    fetcher: Arc<F>,
    policy: RetryPolicy,
    workdir: PathBuf,
    assets: Mutex<HashMap<String, AssetCell>>,
}

impl<F: MediaFetcher> Materializer<F> {
    pub fn new(fetcher: Arc<F>, policy: RetryPolicy, workdir: PathBuf) -> Self {
        Self {
            fetcher,
            policy,
            workdir,
            assets: Mutex::new(HashMap::new()),
        }
    }

    /// Produce on-disk assets for a record, idempotently per uid.
    ///
    /// The first caller for a uid performs the fetch; concurrent and later
    /// callers wait on it and share the same asset. At most one fetch is
    /// in flight per uid at any time.
    pub async fn materialize(
        &self,
        record: &ContentRecord,
        plan: &EntryPlan,
    ) -> Result<Arc<MaterializedAsset>, MaterializeError> {
        let cell = {
            let mut assets = self.assets.lock().await;
            assets
                .entry(record.uid.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let asset = cell
            .get_or_try_init(|| async {
                self.fetch_asset(record, plan).await.map(Arc::new)
            })
            .await?;

        Ok(asset.clone())
    }

    /// Look up an already-materialized asset without fetching
    pub async fn get(&self, uid: &str) -> Option<Arc<MaterializedAsset>> {
        let assets = self.assets.lock().await;
        assets.get(uid).and_then(|cell| cell.get().cloned())
    }

    /// Resolve collection-level artwork into `output_path`.
    ///
    /// The desired role is classified from the output file name; unsupported
    /// names and failed fetches return `false` so a fallback artwork policy
    /// can apply externally. Never fatal.
    pub async fn resolve_thumbnail(&self, locator: &str, output_path: &Path) -> bool {
        let name = output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let Some(role) = classify_output_name(&name) else {
            debug!(name = %name, "unsupported artwork name, skipping");
            return false;
        };

        if let Some(parent) = output_path.parent() {
            if tokio::fs::create_dir_all(parent).await.is_err() {
                return false;
            }
        }

        match self.fetcher.fetch_thumbnail(locator, output_path).await {
            Ok(true) => {
                debug!(?role, path = %output_path.display(), "artwork resolved");
                true
            }
            Ok(false) => false,
            Err(err) => {
                warn!(?role, error = %err, "artwork fetch failed");
                false
            }
        }
    }

    /// One full fetch: media to scratch, promote, then entry thumbnail
    async fn fetch_asset(
        &self,
        record: &ContentRecord,
        plan: &EntryPlan,
    ) -> Result<MaterializedAsset, MaterializeError> {
        let scratch = self.scratch_path(record);

        self.fetch_media_with_retry(record, &scratch).await?;
        promote(&scratch, &plan.media_path)
            .await
            .map_err(|source| MaterializeError::Staging {
                uid: record.uid.clone(),
                source,
            })?;

        let thumbnail_path = self.fetch_entry_thumbnail(record, plan).await;

        debug!(uid = %record.uid, path = %plan.media_path.display(), "materialized");

        Ok(MaterializedAsset {
            uid: record.uid.clone(),
            media_path: plan.media_path.clone(),
            thumbnail_path,
        })
    }

    async fn fetch_media_with_retry(
        &self,
        record: &ContentRecord,
        scratch: &Path,
    ) -> Result<(), MaterializeError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.fetcher.fetch_media(record, scratch).await {
                Ok(()) => return Ok(()),
                Err(err) if self.policy.should_retry(attempt) => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(
                        uid = %record.uid,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "media fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Err(MaterializeError::Fetch {
                        uid: record.uid.clone(),
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    /// Entry thumbnail is best-effort: a missing or failed image leaves the
    /// asset without one.
    async fn fetch_entry_thumbnail(
        &self,
        record: &ContentRecord,
        plan: &EntryPlan,
    ) -> Option<PathBuf> {
        let url = record.thumbnail_url.as_deref()?;
        let dest = plan.thumbnail_path.as_deref()?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.ok()?;
        }

        match self.fetcher.fetch_thumbnail(url, dest).await {
            Ok(true) => Some(dest.to_path_buf()),
            Ok(false) => None,
            Err(err) => {
                warn!(uid = %record.uid, error = %err, "entry thumbnail fetch failed");
                None
            }
        }
    }

    /// Scratch file path keyed by a uid content hash; uids may contain
    /// path-hostile characters.
    fn scratch_path(&self, record: &ContentRecord) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(record.uid.as_bytes());
        let digest = hex::encode(hasher.finalize());

        self.workdir.join(format!("{}.{}", &digest[..12], record.ext))
    }
}

/// Move a finished download from scratch to its library path.
///
/// Rename first; fall back to copy+remove when the library lives on another
/// filesystem.
async fn promote(scratch: &Path, dest: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if tokio::fs::rename(scratch, dest).await.is_ok() {
        return Ok(());
    }

    tokio::fs::copy(scratch, dest).await?;
    tokio::fs::remove_file(scratch).await
}
