use crate::engine::{SoundId, SoundStatus};
use crate::player::{PlaybackStatus, Session};
use crate::registry::SoundRegistry;

/// State tag slot shared by links, transport controls and the document.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LinkState {
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTrack {
    pub sound: SoundId,
    pub index: usize,
    pub title: String,
    pub permalink: Option<String>,
}

/// Everything the page should show for one session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceState {
    pub status: PlaybackStatus,
    /// Tag for the play/pause control, the document and the active links.
    pub tag: Option<LinkState>,
    /// Tag for the play-all control; it only claims to be playing while the
    /// active track still belongs to the playlist.
    pub play_all_tag: Option<LinkState>,
    pub buffering: bool,
    pub active: Option<ActiveTrack>,
    /// Sounds whose links carry the error tag.
    pub errored: Vec<SoundId>,
    pub dragging: bool,
}

pub fn project(session: &Session, registry: &SoundRegistry) -> SurfaceState {
    let record = session
        .active()
        .and_then(|id| registry.get(id))
        .map(|h| &h.record);

    let tag = match session.status() {
        PlaybackStatus::Playing => Some(LinkState::Playing),
        PlaybackStatus::Paused => Some(LinkState::Paused),
        PlaybackStatus::Stopped | PlaybackStatus::Finished => None,
    };
    let orphaned = record.is_some_and(|r| r.orphaned);
    let play_all_tag = match tag {
        Some(LinkState::Playing) if orphaned => None,
        other => other,
    };

    SurfaceState {
        status: session.status(),
        tag,
        play_all_tag,
        buffering: record.is_some_and(|r| r.buffering),
        active: record.map(|r| ActiveTrack {
            sound: r.descriptor.sound.clone(),
            index: r.descriptor.index,
            title: r.descriptor.title.clone(),
            permalink: r.descriptor.permalink.clone(),
        }),
        errored: registry.errored(),
        dragging: session.is_dragging(),
    }
}

/// Playback progress of the active sound, in milliseconds.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Progress {
    pub position_ms: f64,
    pub duration_ms: Option<f64>,
}

impl Progress {
    pub fn from_status(status: &SoundStatus) -> Self {
        Self {
            position_ms: status.position_ms,
            duration_ms: status.duration_estimate_ms.or(status.duration_ms),
        }
    }

    /// Position as a percentage of the duration, floored to two decimals.
    pub fn percent(&self) -> Option<f64> {
        let duration = self.duration_ms.filter(|d| d.is_finite() && *d > 0.0)?;
        let pct = (self.position_ms / duration * 10_000.0).floor() / 100.0;
        pct.is_finite().then_some(pct.clamp(0.0, 100.0))
    }
}

/// `m:ss`, minutes unbounded.
pub fn format_clock(ms: f64) -> String {
    let secs = if ms.is_finite() && ms > 0.0 {
        (ms / 1000.0).floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", secs / 60, secs % 60)
}
