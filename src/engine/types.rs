use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use crate::error::EngineError;

/// Stable identifier of a sound (the link's source reference).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(String);

impl SoundId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SoundId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of one registry handle. Never reused within a player's lifetime.
/// A handle that is activated again keeps its key; the run number tells the
/// activations apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HandleKey(pub u64);

/// What the engine needs to create a sound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundSpec {
    pub id: SoundId,
    pub url: String,
    pub mime_type: Option<String>,
}

/// Load progress of a sound.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ReadyState {
    #[default]
    Uninitialised,
    Loading,
    /// The source could not be reached or decoded.
    Failed,
    Loaded,
}

/// Readable properties of a sound at a point in time. Durations and
/// positions are in milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoundStatus {
    pub position_ms: f64,
    /// Exact duration, once known.
    pub duration_ms: Option<f64>,
    /// Best guess while loading; equal to `duration_ms` once loaded.
    pub duration_estimate_ms: Option<f64>,
    pub bytes_loaded: u64,
    pub bytes_total: Option<u64>,
    pub is_buffering: bool,
    pub ready_state: ReadyState,
    pub paused: bool,
    pub playing: bool,
}

impl SoundStatus {
    /// Fraction of the source loaded so far, when the total is known.
    pub fn loaded_fraction(&self) -> Option<f64> {
        match self.bytes_total {
            Some(total) if total > 0 => Some(self.bytes_loaded as f64 / total as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SoundEventKind {
    Play,
    Stop,
    Pause,
    Resume,
    Finish,
    /// Periodic while the sound plays; read the position from [`SoundEngine::status`].
    WhilePlaying,
    /// Periodic while the source loads.
    WhileLoading,
    /// Buffering started or stopped, or the load failed.
    BufferChange,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SoundEvent {
    pub handle: HandleKey,
    /// Activation of the handle the event was emitted under.
    pub run: u64,
    pub kind: SoundEventKind,
}

/// The sending half of the event channel, bound to one handle.
///
/// `run` is shared with the registry, which bumps it each time the sound is
/// activated; every event is stamped with its value at emit time.
#[derive(Debug, Clone)]
pub struct SoundCallbacks {
    handle: HandleKey,
    run: Arc<AtomicU64>,
    tx: Sender<SoundEvent>,
}

impl SoundCallbacks {
    pub fn new(handle: HandleKey, run: Arc<AtomicU64>, tx: Sender<SoundEvent>) -> Self {
        Self { handle, run, tx }
    }

    pub fn handle(&self) -> HandleKey {
        self.handle
    }

    /// Queue an event for the player. A player that has gone away is not an error.
    pub fn emit(&self, kind: SoundEventKind) {
        let _ = self.tx.send(SoundEvent {
            handle: self.handle,
            run: self.run.load(Ordering::Acquire),
            kind,
        });
    }
}

/// Sound engine collaborator.
///
/// Playback commands on unknown ids are ignored.
pub trait SoundEngine {
    /// Whether the engine recognises `url` (or `mime_type`) as something it can play.
    fn can_play_link(&self, url: &str, mime_type: Option<&str>) -> bool;

    /// Register a sound. It does not start playing.
    fn create_sound(&mut self, spec: SoundSpec, callbacks: SoundCallbacks)
    -> Result<(), EngineError>;

    fn play(&mut self, id: &SoundId);
    fn pause(&mut self, id: &SoundId);
    fn resume(&mut self, id: &SoundId);
    fn toggle_pause(&mut self, id: &SoundId);
    fn stop(&mut self, id: &SoundId);
    /// Release the loaded data; a later `play` loads again.
    fn unload(&mut self, id: &SoundId);
    fn set_position(&mut self, id: &SoundId, position_ms: u64);

    fn status(&self, id: &SoundId) -> Option<SoundStatus>;

    /// Forget every sound.
    fn reset(&mut self);
}
