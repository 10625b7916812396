//! Declared sources and the ordered source set.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One declared source with a fixed priority.
///
/// Lower ordinals are higher priority: when the same uid is extracted from
/// several sources, the lowest-ordinal source owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Priority ordinal, unique within a source set
    pub ordinal: u32,

    /// Opaque fetch target handed to the extractor
    pub locator: String,

    /// Optional display name, overrides extracted playlist titles
    pub label: Option<String>,
}

/// The ordered, caller-declared list of sources.
///
/// Pure configuration: iteration is always by ascending ordinal, and ordinals
/// are validated unique at construction.
#[derive(Debug, Clone)]
pub struct SourceSet {
    sources: Vec<Source>,
}

impl SourceSet {
    /// Build a source set from explicit sources, validating ordinals
    pub fn new(mut sources: Vec<Source>) -> Result<Self> {
        if sources.is_empty() {
            anyhow::bail!("Source set must declare at least one source");
        }

        sources.sort_by_key(|s| s.ordinal);
        for pair in sources.windows(2) {
            if pair[0].ordinal == pair[1].ordinal {
                anyhow::bail!(
                    "Duplicate source ordinal {} ('{}' and '{}')",
                    pair[0].ordinal,
                    pair[0].locator,
                    pair[1].locator
                );
            }
        }

        Ok(Self { sources })
    }

    /// Build a source set from declaration order: the first entry gets
    /// ordinal 0, the second ordinal 1, and so on.
    pub fn from_declarations(entries: Vec<(String, Option<String>)>) -> Result<Self> {
        let sources = entries
            .into_iter()
            .enumerate()
            .map(|(i, (locator, label))| Source {
                ordinal: i as u32,
                locator,
                label,
            })
            .collect();

        Self::new(sources)
    }

    /// Iterate sources by ascending ordinal
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    /// Look up a source by ordinal
    pub fn get(&self, ordinal: u32) -> Option<&Source> {
        self.sources.iter().find(|s| s.ordinal == ordinal)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
