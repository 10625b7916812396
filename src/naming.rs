//! Output naming for materialized assets.
//!
//! The core never interprets templates itself; it asks the layout for an
//! [`EntryPlan`] and hands that to the materializer. Templates support the
//! placeholders `{collection}`, `{collection_index}`, `{index}`, `{uid}`,
//! `{title}`, `{ext}` and `{upload_year}`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{Collection, ContentRecord};

/// Naming templates for entries and artwork
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Template for the primary media path, relative to the output root
    #[serde(default = "default_media_template")]
    pub media: String,

    /// Template for the entry thumbnail path; empty disables thumbnails
    #[serde(default = "default_thumbnail_template")]
    pub thumbnail: String,
}

fn default_media_template() -> String {
    "{collection}/{index} - {title}.{ext}".to_string()
}

fn default_thumbnail_template() -> String {
    "{collection}/{index} - {title}-thumb.jpg".to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            media: default_media_template(),
            thumbnail: default_thumbnail_template(),
        }
    }
}

/// Resolved paths for one entry
#[derive(Debug, Clone)]
pub struct EntryPlan {
    pub media_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
}

/// Maps collections and records to concrete output paths
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    config: NamingConfig,
}

impl Layout {
    pub fn new(root: PathBuf, config: NamingConfig) -> Self {
        Self { root, config }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Plan output paths for a record at `position` (0-based) within its
    /// collection.
    pub fn plan(
        &self,
        collection: &Collection,
        position: usize,
        record: &ContentRecord,
    ) -> EntryPlan {
        let media_path = self
            .root
            .join(self.render(&self.config.media, collection, position, record));

        let thumbnail_path = if self.config.thumbnail.is_empty() {
            None
        } else {
            Some(
                self.root
                    .join(self.render(&self.config.thumbnail, collection, position, record)),
            )
        };

        EntryPlan {
            media_path,
            thumbnail_path,
        }
    }

    /// Path for collection-level artwork, e.g. `poster.jpg`
    pub fn artwork_path(&self, collection: &Collection, file_name: &str) -> PathBuf {
        self.root
            .join(sanitize(&collection.title))
            .join(file_name)
    }

    fn render(
        &self,
        template: &str,
        collection: &Collection,
        position: usize,
        record: &ContentRecord,
    ) -> String {
        template
            .replace("{collection}", &sanitize(&collection.title))
            .replace("{collection_index}", &(collection.ordinal + 1).to_string())
            .replace("{index}", &format!("{:02}", position + 1))
            .replace("{uid}", &sanitize(&record.uid))
            .replace("{title}", &sanitize(&record.title))
            .replace("{ext}", &record.ext)
            .replace("{upload_year}", &record.upload_year().to_string())
    }
}

/// Strip filesystem-hostile characters from a path component
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
