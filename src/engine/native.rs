//! A [`SoundEngine`] that plays local files through `rodio`.
//!
//! Urls are file paths, optionally prefixed with `file://`. Nothing happens
//! in the background on its own: the host calls [`RodioEngine::poll`]
//! regularly to get progress and finish events.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::prelude::*;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, warn};

use crate::error::EngineError;

use super::types::{
    ReadyState, SoundCallbacks, SoundEngine, SoundEventKind, SoundId, SoundSpec, SoundStatus,
};

const PLAYABLE_EXTENSIONS: [&str; 4] = ["mp3", "flac", "wav", "ogg"];

struct Slot {
    spec: SoundSpec,
    callbacks: SoundCallbacks,
    sink: Option<Sink>,
    ready: ReadyState,
    duration: Option<Duration>,
    bytes_total: Option<u64>,
    /// Start position of the current sink; `Sink::get_pos` counts from here.
    offset: Duration,
}

impl Slot {
    fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| !s.is_paused() && !s.empty())
    }

    fn position(&self) -> Duration {
        self.offset + self.sink.as_ref().map_or(Duration::ZERO, |s| s.get_pos())
    }
}

pub struct RodioEngine {
    stream: OutputStream,
    sounds: HashMap<SoundId, Slot>,
}

impl RodioEngine {
    /// Open the default audio output device.
    pub fn open() -> Result<Self, EngineError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| EngineError::Output(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
        // but noisy for a TUI app.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sounds: HashMap::new(),
        })
    }

    /// Emit progress for playing sounds and finish events for drained ones.
    pub fn poll(&mut self) {
        for slot in self.sounds.values_mut() {
            let Some(sink) = slot.sink.as_ref() else {
                continue;
            };
            if sink.is_paused() {
                continue;
            }
            if sink.empty() {
                slot.sink = None;
                slot.offset = Duration::ZERO;
                slot.callbacks.emit(SoundEventKind::Finish);
            } else {
                slot.callbacks.emit(SoundEventKind::WhilePlaying);
            }
        }
    }

    fn load(&mut self, id: &SoundId, start_at: Duration) -> bool {
        let Some(slot) = self.sounds.get_mut(id) else {
            return false;
        };
        slot.ready = ReadyState::Loading;

        let path = match path_from_url(&slot.spec.url) {
            Some(p) => p,
            None => {
                warn!(sound = %id, url = %slot.spec.url, "only local files can be played");
                slot.ready = ReadyState::Failed;
                slot.callbacks.emit(SoundEventKind::BufferChange);
                return false;
            }
        };

        match create_sink_at(&self.stream, &path, start_at) {
            Ok((sink, bytes)) => {
                slot.sink = Some(sink);
                slot.offset = start_at;
                slot.bytes_total = Some(bytes);
                slot.ready = ReadyState::Loaded;
                if slot.duration.is_none() {
                    slot.duration = probe_duration(&path);
                }
                slot.callbacks.emit(SoundEventKind::WhileLoading);
                slot.callbacks.emit(SoundEventKind::BufferChange);
                true
            }
            Err(e) => {
                warn!(sound = %id, error = %e, "load failed");
                slot.ready = ReadyState::Failed;
                slot.callbacks.emit(SoundEventKind::BufferChange);
                false
            }
        }
    }
}

impl SoundEngine for RodioEngine {
    fn can_play_link(&self, url: &str, mime_type: Option<&str>) -> bool {
        is_playable_url(url, mime_type)
    }

    fn create_sound(
        &mut self,
        spec: SoundSpec,
        callbacks: SoundCallbacks,
    ) -> Result<(), EngineError> {
        if self.sounds.contains_key(&spec.id) {
            return Err(EngineError::CreateFailed {
                id: spec.id,
                reason: "id already in use".to_string(),
            });
        }
        debug!(sound = %spec.id, url = %spec.url, "create sound");
        self.sounds.insert(
            spec.id.clone(),
            Slot {
                spec,
                callbacks,
                sink: None,
                ready: ReadyState::Uninitialised,
                duration: None,
                bytes_total: None,
                offset: Duration::ZERO,
            },
        );
        Ok(())
    }

    fn play(&mut self, id: &SoundId) {
        let needs_load = match self.sounds.get(id) {
            Some(slot) => slot.sink.is_none(),
            None => return,
        };
        if needs_load && !self.load(id, Duration::ZERO) {
            return;
        }
        if let Some(slot) = self.sounds.get(id)
            && let Some(sink) = slot.sink.as_ref()
        {
            sink.play();
            slot.callbacks.emit(SoundEventKind::Play);
        }
    }

    fn pause(&mut self, id: &SoundId) {
        if let Some(slot) = self.sounds.get(id)
            && let Some(sink) = slot.sink.as_ref()
        {
            sink.pause();
            slot.callbacks.emit(SoundEventKind::Pause);
        }
    }

    fn resume(&mut self, id: &SoundId) {
        if let Some(slot) = self.sounds.get(id)
            && let Some(sink) = slot.sink.as_ref()
            && sink.is_paused()
        {
            sink.play();
            slot.callbacks.emit(SoundEventKind::Resume);
        }
    }

    fn toggle_pause(&mut self, id: &SoundId) {
        let state = self
            .sounds
            .get(id)
            .map(|slot| slot.sink.as_ref().map(|s| s.is_paused()));
        match state {
            None => {}
            Some(None) => self.play(id),
            Some(Some(true)) => self.resume(id),
            Some(Some(false)) => self.pause(id),
        }
    }

    fn stop(&mut self, id: &SoundId) {
        if let Some(slot) = self.sounds.get_mut(id)
            && let Some(sink) = slot.sink.take()
        {
            sink.stop();
            slot.offset = Duration::ZERO;
            slot.callbacks.emit(SoundEventKind::Stop);
        }
    }

    fn unload(&mut self, id: &SoundId) {
        if let Some(slot) = self.sounds.get_mut(id) {
            if let Some(sink) = slot.sink.take() {
                sink.stop();
            }
            slot.offset = Duration::ZERO;
            slot.ready = ReadyState::Uninitialised;
        }
    }

    fn set_position(&mut self, id: &SoundId, position_ms: u64) {
        let target = Duration::from_millis(position_ms);
        let Some(slot) = self.sounds.get_mut(id) else {
            return;
        };
        let Some(sink) = slot.sink.as_ref() else {
            return;
        };
        if slot.offset.is_zero() && sink.try_seek(target).is_ok() {
            return;
        }

        // The decoder cannot seek (or the sink was already rebuilt at an
        // offset): rebuild it and skip into the file instead.
        let was_paused = sink.is_paused();
        sink.stop();
        slot.sink = None;
        if self.load(id, target)
            && !was_paused
            && let Some(sink) = self.sounds.get(id).and_then(|s| s.sink.as_ref())
        {
            sink.play();
        }
    }

    fn status(&self, id: &SoundId) -> Option<SoundStatus> {
        let slot = self.sounds.get(id)?;
        let duration_ms = slot.duration.map(|d| d.as_millis() as f64);
        Some(SoundStatus {
            position_ms: slot.position().as_millis() as f64,
            duration_ms,
            duration_estimate_ms: duration_ms,
            bytes_loaded: if slot.ready == ReadyState::Loaded {
                slot.bytes_total.unwrap_or(0)
            } else {
                0
            },
            bytes_total: slot.bytes_total,
            is_buffering: false,
            ready_state: slot.ready,
            paused: slot.sink.as_ref().is_some_and(|s| s.is_paused()),
            playing: slot.is_playing(),
        })
    }

    fn reset(&mut self) {
        for (_, slot) in self.sounds.drain() {
            if let Some(sink) = slot.sink {
                sink.stop();
            }
        }
    }
}

/// Whether `url` names a file type rodio can decode, judged by the mime type
/// when one is given and by the extension otherwise.
pub(super) fn is_playable_url(url: &str, mime_type: Option<&str>) -> bool {
    if mime_type.is_some_and(|m| m.trim().to_ascii_lowercase().starts_with("audio/")) {
        return true;
    }
    let path = url.split(['?', '#']).next().unwrap_or_default();
    Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            PLAYABLE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Map a link url to a local path. Remote urls are not supported.
pub(super) fn path_from_url(url: &str) -> Option<PathBuf> {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if url.is_empty() || url.contains("://") {
        return None;
    }
    Some(PathBuf::from(url))
}

/// Create a paused `Sink` for the file at `path` that starts playback at `start_at`.
/// Also returns the file size in bytes.
fn create_sink_at(
    stream: &OutputStream,
    path: &Path,
    start_at: Duration,
) -> Result<(Sink, u64), EngineError> {
    let load_err = |reason: String| EngineError::Load {
        url: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| load_err(e.to_string()))?;
    let bytes = file.metadata().map(|m| m.len()).unwrap_or(0);

    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| load_err(e.to_string()))?
        // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
        .skip_duration(start_at);

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok((sink, bytes))
}

pub(super) fn probe_duration(path: &Path) -> Option<Duration> {
    let tagged = lofty::read_from_path(path).ok()?;
    let duration = tagged.properties().duration();
    (!duration.is_zero()).then_some(duration)
}
