//! End-to-End Sync Tests
//!
//! Runs the full pipeline against fixture collaborators: concurrent
//! extraction with forced completion orders, merge, and materialization
//! into a temporary library.

use std::sync::Arc;
use std::time::Duration;

use medley::domain::{Collection, ContentRecord, Source, SourceSet};
use medley::materialize::Materializer;
use medley::naming::{Layout, NamingConfig};
use medley::testing::{fixture_record, with_channel_thumbnails, FixtureExtractor, FixtureFetcher};
use medley::{FailureMode, RetryPolicy, SyncRunner};
use tempfile::TempDir;

fn two_sources() -> SourceSet {
    SourceSet::new(vec![
        Source {
            ordinal: 0,
            locator: "https://example.com/show/1".to_string(),
            label: None,
        },
        Source {
            ordinal: 1,
            locator: "https://example.com/show/2".to_string(),
            label: None,
        },
    ])
    .unwrap()
}

fn first_source_records() -> Vec<ContentRecord> {
    vec![
        fixture_record("21-1", "20210808", "Download First", 1, 4),
        fixture_record("20-1", "20200808", "Download First", 2, 4),
        fixture_record("20-2", "20200808", "Download First", 3, 4),
        fixture_record("20-3", "20200807", "Download First", 4, 4),
    ]
}

fn second_source_records() -> Vec<ContentRecord> {
    vec![
        fixture_record("20-3", "20200807", "Download Second", 1, 5),
        fixture_record("20-4", "20200806", "Download Second", 2, 5),
        fixture_record("20-5", "20200706", "Download Second", 3, 5),
        fixture_record("20-6", "20200706", "Download Second", 4, 5),
        fixture_record("20-7", "20200606", "Download Second", 5, 5),
    ]
}

struct Harness {
    temp: TempDir,
    fetcher: Arc<FixtureFetcher>,
    runner: SyncRunner<FixtureExtractor, FixtureFetcher>,
}

impl Harness {
    fn new(extractor: FixtureExtractor, mode: FailureMode) -> Self {
        let temp = TempDir::new().unwrap();
        let workdir = temp.path().join("work");
        std::fs::create_dir_all(&workdir).unwrap();

        let fetcher = Arc::new(FixtureFetcher::new());
        let materializer = Arc::new(Materializer::new(
            fetcher.clone(),
            RetryPolicy::immediate(3),
            workdir,
        ));

        let runner = SyncRunner::new(
            Arc::new(extractor),
            materializer,
            RetryPolicy::immediate(3),
            mode,
        );

        Self {
            temp,
            fetcher,
            runner,
        }
    }

    fn layout(&self) -> Layout {
        Layout::new(self.temp.path().join("library"), NamingConfig::default())
    }

    async fn run(&self) -> anyhow::Result<medley::RunReport> {
        self.runner
            .run("test-show", &two_sources(), &self.layout())
            .await
    }
}

/// Run the overlap scenario with one source delayed, so the other finishes
/// extraction first
async fn run_with_delayed_source(delayed: u32) -> (Vec<Collection>, Arc<FixtureFetcher>) {
    let extractor = FixtureExtractor::new()
        .with_records(0, first_source_records())
        .with_records(1, second_source_records())
        .with_delay(delayed, Duration::from_millis(50));

    let harness = Harness::new(extractor, FailureMode::BestEffort);
    let report = harness.run().await.unwrap();

    (report.collections, harness.fetcher.clone())
}

#[tokio::test]
async fn test_collections_invariant_to_completion_order() {
    let (first_finishes_last, _) = run_with_delayed_source(0).await;
    let (second_finishes_last, _) = run_with_delayed_source(1).await;

    assert_eq!(
        serde_json::to_string(&first_finishes_last).unwrap(),
        serde_json::to_string(&second_finishes_last).unwrap()
    );

    assert_eq!(first_finishes_last[0].title, "Download First");
    assert_eq!(
        first_finishes_last[0].uids(),
        vec!["21-1", "20-1", "20-2", "20-3"]
    );
    assert_eq!(first_finishes_last[1].title, "Download Second");
    assert_eq!(
        first_finishes_last[1].uids(),
        vec!["20-4", "20-5", "20-6", "20-7"]
    );
}

#[tokio::test]
async fn test_shared_uid_fetched_exactly_once() {
    // Delay the canonical source: its duplicate-bearing results arrive last,
    // which must not cause a second fetch of the shared uid
    let (collections, fetcher) = run_with_delayed_source(0).await;

    assert_eq!(fetcher.media_fetch_count("20-3"), 1);

    // 8 distinct uids total across both sources
    assert_eq!(fetcher.total_media_fetches(), 8);

    let placed: usize = collections
        .iter()
        .map(|c| c.uids().iter().filter(|u| **u == "20-3").count())
        .sum();
    assert_eq!(placed, 1);
}

#[tokio::test]
async fn test_media_files_land_in_canonical_collection() {
    let harness = Harness::new(
        FixtureExtractor::new()
            .with_records(0, first_source_records())
            .with_records(1, second_source_records()),
        FailureMode::BestEffort,
    );

    harness.run().await.unwrap();

    let library = harness.temp.path().join("library");
    assert!(library
        .join("Download First")
        .join("04 - Mock Entry 20-3.mp4")
        .exists());
    assert!(!library
        .join("Download Second")
        .join("01 - Mock Entry 20-3.mp4")
        .exists());
}

#[tokio::test]
async fn test_transient_extraction_failures_recover() {
    let harness = Harness::new(
        FixtureExtractor::new()
            .with_transient_failures(0, 2, first_source_records())
            .with_records(1, second_source_records()),
        FailureMode::BestEffort,
    );

    let report = harness.run().await.unwrap();

    assert_eq!(report.collections.len(), 2);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_best_effort_skips_failed_source() {
    let harness = Harness::new(
        FixtureExtractor::new()
            .with_records(0, first_source_records())
            .with_permanent_failure(1, "playlist removed"),
        FailureMode::BestEffort,
    );

    let report = harness.run().await.unwrap();

    // Smaller but consistent result plus a warning
    assert_eq!(report.collections.len(), 1);
    assert_eq!(report.collections[0].title, "Download First");
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].to_string().contains("playlist removed"));
}

#[tokio::test]
async fn test_strict_mode_aborts_on_permanent_failure() {
    let harness = Harness::new(
        FixtureExtractor::new()
            .with_records(0, first_source_records())
            .with_permanent_failure(1, "playlist removed"),
        FailureMode::Strict,
    );

    let result = harness.run().await;
    assert!(result.is_err());

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("source 1"));
}

#[tokio::test]
async fn test_strict_mode_aborts_on_exhausted_retries() {
    let harness = Harness::new(
        FixtureExtractor::new()
            .with_records(0, first_source_records())
            .with_transient_failures(1, 99, second_source_records()),
        FailureMode::Strict,
    );

    assert!(harness.run().await.is_err());
}

#[tokio::test]
async fn test_failed_materialize_drops_uid_only() {
    let harness = Harness::new(
        FixtureExtractor::new()
            .with_records(0, first_source_records())
            .with_records(1, second_source_records()),
        FailureMode::BestEffort,
    );
    harness.fetcher.fail_media("20-4", u32::MAX);

    let report = harness.run().await.unwrap();

    assert_eq!(
        report.collections[1].uids(),
        vec!["20-5", "20-6", "20-7"],
        "only the failed uid is dropped"
    );
    assert_eq!(report.collections[0].records.len(), 4);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].to_string().contains("20-4"));
}

#[tokio::test]
async fn test_source_counts_are_pre_merge() {
    let harness = Harness::new(
        FixtureExtractor::new()
            .with_records(0, first_source_records())
            .with_records(1, second_source_records()),
        FailureMode::BestEffort,
    );

    let report = harness.run().await.unwrap();

    assert_eq!(report.source_counts.get(&0), Some(&4));
    assert_eq!(report.source_counts.get(&1), Some(&5));
    // One overlapping uid deduplicated in the final collections
    assert_eq!(report.total_records(), 8);
}

#[tokio::test]
async fn test_channel_artwork_resolved_per_collection() {
    let records: Vec<ContentRecord> = first_source_records()
        .into_iter()
        .map(with_channel_thumbnails)
        .collect();

    let harness = Harness::new(
        FixtureExtractor::new().with_records(0, records),
        FailureMode::BestEffort,
    );

    let report = harness
        .runner
        .run(
            "test-show",
            &SourceSet::new(vec![Source {
                ordinal: 0,
                locator: "https://example.com/channel".to_string(),
                label: None,
            }])
            .unwrap(),
            &harness.layout(),
        )
        .await
        .unwrap();

    assert_eq!(report.collections.len(), 1);

    let collection_dir = harness.temp.path().join("library").join("Download First");
    assert!(collection_dir.join("poster.jpg").exists());
    assert!(collection_dir.join("fanart.jpg").exists());
    assert_eq!(
        harness
            .fetcher
            .thumbnail_fetch_count("https://avatar_uncropped.com"),
        1
    );
}

#[tokio::test]
async fn test_empty_source_contributes_nothing() {
    let harness = Harness::new(
        FixtureExtractor::new()
            .with_records(0, first_source_records())
            .with_records(1, Vec::new()),
        FailureMode::BestEffort,
    );

    let report = harness.run().await.unwrap();

    assert_eq!(report.collections.len(), 1);
    assert_eq!(report.source_counts.get(&1), Some(&0));
    assert!(report.warnings.is_empty());
}
