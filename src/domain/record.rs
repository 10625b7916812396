//! Content records produced by extraction.
//!
//! A record is one source's view of one piece of content at extraction time.
//! Records are immutable once produced: the resolver selects or discards
//! whole instances, it never rewrites fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A thumbnail descriptor carried on a source's playlist metadata.
///
/// The `id` is whatever role name the source reports (e.g. a channel may
/// expose `avatar_uncropped` and `banner_uncropped` images).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailRef {
    /// Role identifier as reported by the source
    pub id: String,

    /// Fetch URL for the image
    pub url: String,
}

/// A single piece of content as seen by one source.
///
/// `uid` is the sole identity of the content: the same uid may legitimately
/// appear in records from multiple sources, but is placed in exactly one
/// final collection and fetched at most once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Globally unique content identity, stable across sources
    pub uid: String,

    /// Display title
    pub title: String,

    /// Upload date, the primary ordering key within a collection
    pub upload_date: NaiveDate,

    /// Title of the playlist grouping this record was extracted from
    pub playlist_title: String,

    /// 1-based position within the originating source's result set
    pub playlist_index: u32,

    /// Size of the originating source's result set
    pub playlist_count: u32,

    /// Name of the extractor backend that produced this record
    pub extractor: String,

    /// Media container extension (e.g. "mp4")
    pub ext: String,

    /// Long-form description, passed through unmodified
    pub description: String,

    /// Canonical webpage for the content
    pub webpage_url: String,

    /// Direct media locator handed to the fetch collaborator
    pub media_url: String,

    /// Per-entry thumbnail, if the source reported one
    pub thumbnail_url: Option<String>,

    /// Playlist-level thumbnail descriptors (channel avatar, banner, ...)
    #[serde(default)]
    pub playlist_thumbnails: Vec<ThumbnailRef>,
}

impl ContentRecord {
    /// Upload year, used by naming templates
    pub fn upload_year(&self) -> i32 {
        use chrono::Datelike;
        self.upload_date.year()
    }
}
