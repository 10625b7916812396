//! Thumbnail role classification.
//!
//! Artwork destinations encode their role in the output file name; anything
//! that classifies as neither poster nor fanart is unsupported and skipped,
//! letting a fallback artwork policy apply externally.

/// Artwork role resolved from an output file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailRole {
    /// Primary artwork (`poster`/`show`-class names)
    Poster,

    /// Background artwork (`fanart`-class names)
    Fanart,
}

/// Classify the desired artwork role from an output file name.
///
/// Returns `None` for unsupported names.
pub fn classify_output_name(name: &str) -> Option<ThumbnailRole> {
    if name.contains("poster") || name.contains("show") {
        Some(ThumbnailRole::Poster)
    } else if name.contains("fanart") {
        Some(ThumbnailRole::Fanart)
    } else {
        None
    }
}
