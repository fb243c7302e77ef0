use std::collections::HashSet;

use crate::engine::SoundId;
use crate::page::ElementId;

/// One playable link as seen by a single scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    /// Position in the playlist, dense in `[0, len)`.
    pub index: usize,
    pub sound: SoundId,
    pub url: String,
    pub title: String,
    pub permalink: Option<String>,
    pub mime_type: Option<String>,
    pub element: ElementId,
}

/// Ordered result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    tracks: Vec<TrackDescriptor>,
}

/// Sound ids that appeared or disappeared between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<SoundId>,
    pub removed: Vec<SoundId>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl Snapshot {
    pub(crate) fn from_tracks(tracks: Vec<TrackDescriptor>) -> Self {
        debug_assert!(tracks.iter().enumerate().all(|(i, t)| t.index == i));
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackDescriptor> {
        self.tracks.get(index)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.tracks.len().checked_sub(1)
    }

    pub fn tracks(&self) -> &[TrackDescriptor] {
        &self.tracks
    }

    /// First descriptor carrying `sound`. A sound linked twice resolves to
    /// its earliest position.
    pub fn find_sound(&self, sound: &SoundId) -> Option<&TrackDescriptor> {
        self.tracks.iter().find(|t| &t.sound == sound)
    }

    pub fn find_element(&self, el: ElementId) -> Option<&TrackDescriptor> {
        self.tracks.iter().find(|t| t.element == el)
    }

    /// A new snapshot with `track` appended at the end. The descriptor's
    /// index is overwritten to keep the numbering dense.
    pub fn with_appended(&self, mut track: TrackDescriptor) -> Self {
        track.index = self.tracks.len();
        let mut tracks = self.tracks.clone();
        tracks.push(track);
        Self { tracks }
    }

    pub fn diff(&self, newer: &Snapshot) -> SnapshotDiff {
        let old: HashSet<&SoundId> = self.tracks.iter().map(|t| &t.sound).collect();
        let new: HashSet<&SoundId> = newer.tracks.iter().map(|t| &t.sound).collect();
        SnapshotDiff {
            added: newer
                .tracks
                .iter()
                .filter(|t| !old.contains(&t.sound))
                .map(|t| t.sound.clone())
                .collect(),
            removed: self
                .tracks
                .iter()
                .filter(|t| !new.contains(&t.sound))
                .map(|t| t.sound.clone())
                .collect(),
        }
    }
}
