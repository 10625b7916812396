//! medley - multi-source media subscription sync
//!
//! A downloader that merges several prioritized source URLs into
//! deterministic, deduplicated collections and fetches each piece of
//! content exactly once.
//!
//! # Architecture
//!
//! The pipeline runs in two phases:
//! - Extraction: every declared source is extracted as an independent
//!   concurrent task; results are collected per ordinal.
//! - Resolution + materialization: once all sources report, a pure merge
//!   pass assigns each uid to its lowest-ordinal source, and only then are
//!   assets fetched, with a per-uid single-flight guard.
//!
//! The final collections are invariant to the order in which sources
//! finished extracting.
//!
//! # Modules
//!
//! - `extract`: source extractors (HTTP/JSON) and retry wrapping
//! - `core`: resolver, retry policy, and the sync runner
//! - `materialize`: idempotent asset fetch and thumbnail resolution
//! - `domain`: data structures (records, sources, collections)
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Sync a subscription
//! medley sync show.yaml
//!
//! # Preview the merged layout without downloading
//! medley plan show.yaml
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod extract;
pub mod materialize;
pub mod naming;
pub mod testing;

// Re-export main types at crate root for convenience
pub use config::Subscription;
pub use crate::core::{resolve, FailureMode, ResolvedPlan, RetryPolicy, SyncRunner};
pub use domain::{Collection, ContentRecord, RunReport, RunWarning, Source, SourceSet};
pub use extract::{ExtractError, Extractor, HttpExtractor};
pub use materialize::{MaterializeError, MaterializedAsset, Materializer, MediaFetcher};
pub use naming::{EntryPlan, Layout, NamingConfig};
