//! Deterministic merge of per-source extraction results into collections.
//!
//! This is pure computation over already-collected data: the output depends
//! only on the complete per-ordinal mapping, never on the real-time order in
//! which sources finished extracting. No I/O happens here.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::domain::{Collection, ContentRecord, SourceSet};

/// Structural impossibilities in resolution. Always fatal.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("canonical ordinal {0} has no declared source")]
    UnknownOrdinal(u32),
}

/// Merge per-source record lists into the final ordered collections.
///
/// Each uid is placed in exactly one collection: the one belonging to the
/// lowest-ordinal source whose extraction contained it. Within a collection,
/// records are ordered by upload date descending, ties broken by playlist
/// index ascending. Collections are emitted by ordinal ascending.
pub fn resolve(
    per_source: &BTreeMap<u32, Vec<ContentRecord>>,
    sources: &SourceSet,
) -> Result<Vec<Collection>, ResolveError> {
    // uid -> (canonical ordinal, record). BTreeMap iteration is ordinal
    // ascending, so the first sighting of a uid is already canonical.
    let mut canonical: BTreeMap<&str, (u32, &ContentRecord)> = BTreeMap::new();

    for (&ordinal, records) in per_source {
        for record in records {
            match canonical.get(record.uid.as_str()) {
                None => {
                    canonical.insert(&record.uid, (ordinal, record));
                }
                Some(&(owner, _)) => {
                    debug!(
                        uid = %record.uid,
                        canonical = owner,
                        duplicate = ordinal,
                        "cross-source duplicate, non-canonical instance discarded"
                    );
                }
            }
        }
    }

    // Group canonical records by their owning ordinal
    let mut grouped: BTreeMap<u32, Vec<ContentRecord>> = BTreeMap::new();
    for &(ordinal, record) in canonical.values() {
        grouped.entry(ordinal).or_default().push(record.clone());
    }

    let mut collections = Vec::with_capacity(grouped.len());
    for (ordinal, mut records) in grouped {
        let source = sources
            .get(ordinal)
            .ok_or(ResolveError::UnknownOrdinal(ordinal))?;

        records.sort_by(|a, b| {
            b.upload_date
                .cmp(&a.upload_date)
                .then(a.playlist_index.cmp(&b.playlist_index))
        });

        let title = match &source.label {
            Some(label) => label.clone(),
            None => majority_title(&records),
        };

        collections.push(Collection {
            ordinal,
            title,
            records,
        });
    }

    Ok(collections)
}

/// Pick a collection title from its members' playlist titles: the majority
/// value wins, ties go to the title seen earliest in the source's own
/// playlist order. Pure function of the record multiset.
fn majority_title(records: &[ContentRecord]) -> String {
    let mut tally: Vec<(&str, usize, u32)> = Vec::new();

    for record in records {
        match tally
            .iter_mut()
            .find(|(title, _, _)| *title == record.playlist_title)
        {
            Some(entry) => {
                entry.1 += 1;
                entry.2 = entry.2.min(record.playlist_index);
            }
            None => tally.push((&record.playlist_title, 1, record.playlist_index)),
        }
    }

    tally
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
        .map(|(title, _, _)| (*title).to_string())
        .unwrap_or_default()
}
