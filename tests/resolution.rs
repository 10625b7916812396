//! Resolution Property Tests
//!
//! Exercises the merge pass directly: canonical-ordinal precedence, uid
//! uniqueness, and the ordering law, including the two-source overlap
//! scenario with a shared uid.

use std::collections::{BTreeMap, HashSet};

use medley::domain::{ContentRecord, Source, SourceSet};
use medley::resolve;
use medley::testing::fixture_record;

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
        // Duplicate of the first source's last entry
        fixture_record("20-3", "20200807", "Download Second", 1, 5),
        fixture_record("20-4", "20200806", "Download Second", 2, 5),
        fixture_record("20-5", "20200706", "Download Second", 3, 5),
        fixture_record("20-6", "20200706", "Download Second", 4, 5),
        fixture_record("20-7", "20200606", "Download Second", 5, 5),
    ]
}

#[test]
fn test_two_source_overlap_scenario() {
    let mut per_source = BTreeMap::new();
    per_source.insert(0, first_source_records());
    per_source.insert(1, second_source_records());

    let collections = resolve(&per_source, &two_sources()).unwrap();

    assert_eq!(collections.len(), 2);

    assert_eq!(collections[0].ordinal, 0);
    assert_eq!(collections[0].title, "Download First");
    assert_eq!(collections[0].uids(), vec!["21-1", "20-1", "20-2", "20-3"]);

    // 20-3 is canonical to ordinal 0, so it is excluded here
    assert_eq!(collections[1].ordinal, 1);
    assert_eq!(collections[1].title, "Download Second");
    assert_eq!(collections[1].uids(), vec!["20-4", "20-5", "20-6", "20-7"]);
}

#[test]
fn test_canonical_metadata_wins() {
    let mut per_source = BTreeMap::new();
    per_source.insert(0, first_source_records());
    per_source.insert(1, second_source_records());

    let collections = resolve(&per_source, &two_sources()).unwrap();

    // The non-canonical instance of 20-3 carried index 1 / count 5; the
    // canonical source's metadata must survive untouched
    let record = collections[0]
        .records
        .iter()
        .find(|r| r.uid == "20-3")
        .unwrap();

    assert_eq!(record.playlist_title, "Download First");
    assert_eq!(record.playlist_index, 4);
    assert_eq!(record.playlist_count, 4);
}

#[test]
fn test_uid_appears_exactly_once() {
    let mut per_source = BTreeMap::new();
    per_source.insert(0, first_source_records());
    per_source.insert(1, second_source_records());

    let collections = resolve(&per_source, &two_sources()).unwrap();

    let mut seen = HashSet::new();
    for collection in &collections {
        for record in &collection.records {
            assert!(
                seen.insert(record.uid.clone()),
                "uid '{}' placed more than once",
                record.uid
            );
        }
    }

    assert_eq!(seen.len(), 8);
}

#[test]
fn test_ordering_law_holds() {
    let mut per_source = BTreeMap::new();
    per_source.insert(0, first_source_records());
    per_source.insert(1, second_source_records());

    let collections = resolve(&per_source, &two_sources()).unwrap();

    for collection in &collections {
        for pair in collection.records.windows(2) {
            assert!(
                pair[0].upload_date >= pair[1].upload_date,
                "upload dates out of order in '{}'",
                collection.title
            );
            if pair[0].upload_date == pair[1].upload_date {
                assert!(
                    pair[0].playlist_index <= pair[1].playlist_index,
                    "tie-break out of order in '{}'",
                    collection.title
                );
            }
        }
    }
}

#[test]
fn test_output_independent_of_insertion_order() {
    // BTreeMap erases insertion order, but make the claim explicit: feeding
    // the mapping in either order yields byte-identical collections
    let mut forward = BTreeMap::new();
    forward.insert(0, first_source_records());
    forward.insert(1, second_source_records());

    let mut reverse = BTreeMap::new();
    reverse.insert(1, second_source_records());
    reverse.insert(0, first_source_records());

    let sources = two_sources();
    let a = resolve(&forward, &sources).unwrap();
    let b = resolve(&reverse, &sources).unwrap();

    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_uid_in_three_sources_goes_to_lowest() {
    let sources = SourceSet::new(
        (0..3)
            .map(|i| Source {
                ordinal: i,
                locator: format!("https://example.com/{}", i),
                label: None,
            })
            .collect(),
    )
    .unwrap();

    let mut per_source = BTreeMap::new();
    per_source.insert(0, vec![fixture_record("x", "20200101", "A", 1, 1)]);
    per_source.insert(1, vec![fixture_record("x", "20200101", "B", 1, 1)]);
    per_source.insert(2, vec![fixture_record("x", "20200101", "C", 1, 1)]);

    let collections = resolve(&per_source, &sources).unwrap();

    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].ordinal, 0);
    assert_eq!(collections[0].title, "A");
}
