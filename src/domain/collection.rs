//! Resolved collections and the sync run report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::ContentRecord;

/// An ordered, deduplicated group of content records owned by one source.
///
/// Built once after the merge completes and read-only thereafter. Records are
/// ordered by upload date descending, ties broken by playlist index
/// ascending; a uid appears at most once across all collections of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Ordinal of the canonical source this collection belongs to
    pub ordinal: u32,

    /// Display title (declared label or resolved playlist title)
    pub title: String,

    /// Member records in final order
    pub records: Vec<ContentRecord>,
}

impl Collection {
    /// Member uids in final order
    pub fn uids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.uid.as_str()).collect()
    }
}

/// A non-fatal failure attached to a best-effort run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RunWarning {
    /// A source contributed nothing because extraction failed
    Extraction { ordinal: u32, message: String },

    /// A uid was dropped from its collection because the fetch failed
    Materialization { uid: String, message: String },
}

impl std::fmt::Display for RunWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extraction { ordinal, message } => {
                write!(f, "source {}: {}", ordinal, message)
            }
            Self::Materialization { uid, message } => {
                write!(f, "content '{}': {}", uid, message)
            }
        }
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// Subscription name
    pub name: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: DateTime<Utc>,

    /// Raw record count per source ordinal (pre-merge)
    pub source_counts: BTreeMap<u32, usize>,

    /// Final resolved collections, ordered by ordinal ascending
    pub collections: Vec<Collection>,

    /// Non-fatal failures accumulated during the run
    pub warnings: Vec<RunWarning>,
}

impl RunReport {
    /// Total records across all final collections
    pub fn total_records(&self) -> usize {
        self.collections.iter().map(|c| c.records.len()).sum()
    }
}
