use std::path::Path;

use lofty::prelude::{Accessor, TaggedFileExt};

/// Build a display name for the file at `path`.
///
/// Prefers "Artist - Title" from the file's tags, then the bare title, and
/// falls back to the file stem when the file has no usable tags.
pub fn display_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();

    let mut title: Option<String> = None;
    let mut artist: Option<String> = None;

    if let Ok(tagged) = lofty::read_from_path(path) {
        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            title = tag
                .title()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            artist = tag
                .artist()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
    }

    compose(title.as_deref().unwrap_or(&stem), artist.as_deref())
}

pub(super) fn compose(title: &str, artist: Option<&str>) -> String {
    match artist {
        Some(a) if !a.trim().is_empty() => format!("{} - {}", a.trim(), title.trim()),
        _ => title.trim().to_string(),
    }
}
