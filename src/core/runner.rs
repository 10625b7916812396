//! Sync run orchestration.
//!
//! The runner owns the two-phase protocol: extract every source as an
//! independent concurrent task, collect the complete per-ordinal results,
//! run the resolver as a single deterministic pass, and only then hand
//! records to the materializer. No materialization can happen under a
//! provisional placement.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Collection, RunReport, RunWarning, SourceSet};
use crate::extract::{extract_with_retry, Extractor};
use crate::materialize::{Materializer, MediaFetcher};
use crate::naming::Layout;

use super::resolver::resolve;
use super::retry::RetryPolicy;

/// How the run reacts to permanent failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Abort the whole run on the first permanent failure
    Strict,

    /// Skip the failing source/record, report it as a warning
    #[default]
    BestEffort,
}

/// Extraction + resolution outcome, before any materialization
#[derive(Debug)]
pub struct ResolvedPlan {
    /// Final collections, ordered by ordinal ascending
    pub collections: Vec<Collection>,

    /// Raw record count per source ordinal
    pub source_counts: BTreeMap<u32, usize>,

    /// Extraction failures downgraded to warnings (best-effort mode)
    pub warnings: Vec<RunWarning>,
}

/// Orchestrates one subscription sync
pub struct SyncRunner<E, F>
where
    E: Extractor,
    F: MediaFetcher,
{
    extractor: Arc<E>,
    materializer: Arc<Materializer<F>>,
    policy: RetryPolicy,
    mode: FailureMode,
}

impl<E, F> SyncRunner<E, F>
where
    E: Extractor + 'static,
    F: MediaFetcher + 'static,
{
    pub fn new(
        extractor: Arc<E>,
        materializer: Arc<Materializer<F>>,
        policy: RetryPolicy,
        mode: FailureMode,
    ) -> Self {
        Self {
            extractor,
            materializer,
            policy,
            mode,
        }
    }

    /// Extract all sources and merge, without materializing anything.
    ///
    /// This is the dry-run surface, and the first phase of [`run`].
    ///
    /// [`run`]: Self::run
    #[instrument(skip(self, sources), fields(sources = sources.len()))]
    pub async fn plan(&self, sources: &SourceSet) -> Result<ResolvedPlan> {
        let mut tasks = JoinSet::new();

        for source in sources.iter() {
            let source = source.clone();
            let extractor = Arc::clone(&self.extractor);
            let policy = self.policy.clone();

            tasks.spawn(async move {
                let result = extract_with_retry(extractor.as_ref(), &source, &policy).await;
                (source.ordinal, result)
            });
        }

        // Results are write-once per ordinal; completion order does not
        // matter because nothing is resolved until every task reports.
        let mut per_source = BTreeMap::new();
        let mut warnings = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (ordinal, result) = joined.context("extraction task panicked")?;

            match result {
                Ok(records) => {
                    per_source.insert(ordinal, records);
                }
                Err(err) => match self.mode {
                    FailureMode::Strict => {
                        return Err(anyhow::Error::new(err)
                            .context(format!("source {} failed, aborting sync", ordinal)));
                    }
                    FailureMode::BestEffort => {
                        warn!(ordinal, error = %err, "source skipped");
                        warnings.push(RunWarning::Extraction {
                            ordinal,
                            message: err.to_string(),
                        });
                    }
                },
            }
        }

        let source_counts = per_source
            .iter()
            .map(|(&ordinal, records)| (ordinal, records.len()))
            .collect();

        let collections = resolve(&per_source, sources)?;

        info!(
            collections = collections.len(),
            records = collections.iter().map(|c| c.records.len()).sum::<usize>(),
            "resolution complete"
        );

        Ok(ResolvedPlan {
            collections,
            source_counts,
            warnings,
        })
    }

    /// Run a full sync: extract, resolve, then materialize every resolved
    /// record and the collections' artwork.
    #[instrument(skip(self, sources, layout), fields(name = %name))]
    pub async fn run(&self, name: &str, sources: &SourceSet, layout: &Layout) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "starting sync");

        let ResolvedPlan {
            mut collections,
            source_counts,
            mut warnings,
        } = self.plan(sources).await?;

        let failed = self
            .materialize_collections(&collections, layout, &mut warnings)
            .await?;

        if !failed.is_empty() {
            for collection in &mut collections {
                collection.records.retain(|r| !failed.contains(&r.uid));
            }
        }

        self.resolve_collection_artwork(&collections, layout).await;

        let report = RunReport {
            run_id,
            name: name.to_string(),
            started_at,
            finished_at: Utc::now(),
            source_counts,
            collections,
            warnings,
        };

        info!(
            %run_id,
            records = report.total_records(),
            warnings = report.warnings.len(),
            "sync complete"
        );

        Ok(report)
    }

    /// Materialize every record across all collections concurrently.
    ///
    /// Returns the uids whose materialization failed (best-effort mode);
    /// the caller drops them from the final collections.
    async fn materialize_collections(
        &self,
        collections: &[Collection],
        layout: &Layout,
        warnings: &mut Vec<RunWarning>,
    ) -> Result<HashSet<String>> {
        let mut tasks = JoinSet::new();

        for collection in collections {
            for (position, record) in collection.records.iter().enumerate() {
                let plan = layout.plan(collection, position, record);
                let materializer = Arc::clone(&self.materializer);
                let record = record.clone();

                tasks.spawn(async move {
                    let result = materializer.materialize(&record, &plan).await;
                    (record.uid, result)
                });
            }
        }

        let mut failed = HashSet::new();

        while let Some(joined) = tasks.join_next().await {
            let (uid, result) = joined.context("materialize task panicked")?;

            match result {
                Ok(_asset) => {}
                Err(err) => match self.mode {
                    FailureMode::Strict => {
                        return Err(anyhow::Error::new(err)
                            .context(format!("materializing '{}' failed, aborting sync", uid)));
                    }
                    FailureMode::BestEffort => {
                        warn!(%uid, error = %err, "record dropped");
                        warnings.push(RunWarning::Materialization {
                            uid: uid.clone(),
                            message: err.to_string(),
                        });
                        failed.insert(uid);
                    }
                },
            }
        }

        Ok(failed)
    }

    /// Resolve collection-level artwork from playlist thumbnail descriptors.
    ///
    /// Channel avatars become posters, banners become fanart. Entirely
    /// best-effort; unsupported roles are skipped.
    async fn resolve_collection_artwork(&self, collections: &[Collection], layout: &Layout) {
        for collection in collections {
            let Some(first) = collection.records.first() else {
                continue;
            };

            for thumb in &first.playlist_thumbnails {
                let file_name = if thumb.id.contains("avatar") {
                    "poster.jpg"
                } else if thumb.id.contains("banner") {
                    "fanart.jpg"
                } else {
                    continue;
                };

                let dest = layout.artwork_path(collection, file_name);
                if !self.materializer.resolve_thumbnail(&thumb.url, &dest).await {
                    warn!(
                        collection = %collection.title,
                        artwork = file_name,
                        "collection artwork not resolved"
                    );
                }
            }
        }
    }
}
