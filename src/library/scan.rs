use std::path::Path;

use lofty::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

use tapedeck::config::LibrarySettings;

use super::model::Track;

pub(super) fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Title and artist from the file's tags, the file stem otherwise.
fn read_track(path: &Path) -> Track {
    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist = None;

    if let Ok(tagged) = lofty::read_from_path(path)
        && let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag())
    {
        if let Some(v) = tag.get_string(&ItemKey::TrackTitle)
            && !v.trim().is_empty()
        {
            title = v.to_string();
        }
        artist = tag
            .get_string(&ItemKey::TrackArtist)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
    }

    Track {
        path: path.to_path_buf(),
        title,
        artist,
    }
}

/// Audio files below `dir`, sorted by link text.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut tracks: Vec<Track> = walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
        .filter(|entry| {
            let path = entry.path();
            path.is_file()
                && (settings.include_hidden || !is_hidden(path))
                && is_audio_file(path, settings)
        })
        .map(|entry| read_track(entry.path()))
        .collect();

    tracks.sort_by_key(|t| t.link_text().to_lowercase());
    debug!(dir = %dir.display(), found = tracks.len(), "scanned library");
    tracks
}
