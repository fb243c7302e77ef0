use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::engine::SoundEngine;
use crate::error::Fault;
use crate::page::{ElementId, Page, closest_link};
use crate::registry::SoundRecord;
use crate::scanner::TrackDescriptor;

use super::controller::Player;
use super::types::{InputOutcome, PlaybackStatus, PointerButton};

impl<P, E, C> Player<P, E, C>
where
    P: Page,
    E: SoundEngine,
    C: Clock,
{
    /// A click anywhere in the document. Only clicks on playlist links are
    /// handled; everything else passes through to the page.
    pub fn click(&mut self, target: ElementId, button: PointerButton) -> InputOutcome {
        self.rescan();
        let outcome = self.click_inner(target, button);
        self.sync();
        outcome
    }

    fn click_inner(&mut self, target: ElementId, button: PointerButton) -> InputOutcome {
        if button == PointerButton::Secondary {
            return InputOutcome::PassThrough;
        }
        let Some(link) = closest_link(&self.page, target) else {
            return InputOutcome::PassThrough;
        };
        if !self
            .scanner
            .rules()
            .is_candidate(&self.page, &self.engine, link)
        {
            return InputOutcome::PassThrough;
        }
        if let Some(cued) = self
            .scanner
            .cue(&mut self.page, &self.engine, &self.snapshot, link)
        {
            self.snapshot = cued;
        }
        // Same link outside the playlist scope.
        let Some(track) = self.snapshot.find_element(link).cloned() else {
            return InputOutcome::PassThrough;
        };
        self.toggle_track(track);
        InputOutcome::Handled
    }

    /// The play/pause control: toggle the active track, or start the first.
    pub fn toggle_play_global(&mut self) {
        if self.session.active.is_some() {
            self.toggle_active();
        } else {
            self.start_index(0);
        }
        self.sync();
    }

    /// The play-all control: like play/pause while the active track belongs
    /// to the playlist, otherwise (re)start the playlist from the top.
    pub fn toggle_play_all(&mut self) {
        let in_playlist = self
            .active_record()
            .is_some_and(|record| !record.orphaned);
        if in_playlist {
            self.toggle_active();
        } else {
            self.start_index(0);
        }
        self.sync();
    }

    pub fn next(&mut self) {
        self.advance(true);
        self.sync();
    }

    pub fn previous(&mut self) {
        self.advance(false);
        self.sync();
    }

    /// Move one track forward or back. Without an active track, or when its
    /// position is no longer trustworthy, playback restarts at index 0.
    pub(super) fn advance(&mut self, forward: bool) {
        let Some(record) = self.active_record() else {
            self.start_index(0);
            return;
        };
        if record.orphaned {
            debug!("active track orphaned, restarting playlist");
            self.start_index(0);
            return;
        }

        let index = record.descriptor.index;
        let len = self.snapshot.len();
        let repeat = self.settings.player.repeat_all;
        let target = if forward {
            if index + 1 < len {
                Some(index + 1)
            } else if repeat {
                Some(0)
            } else {
                None
            }
        } else if index > 0 && index - 1 < len {
            Some(index - 1)
        } else if repeat {
            self.snapshot.last_index()
        } else {
            None
        };

        match target {
            Some(i) => self.start_index(i),
            None if forward => {
                debug!(index, len, "end of playlist, stopping");
                self.stop_at_end();
            }
            None => debug!(index, "start of playlist"),
        }
    }

    /// Ran off the end of the playlist: the last track stays active but
    /// stopped, so play/pause starts it over.
    fn stop_at_end(&mut self) {
        let Some(id) = self.session.active.clone() else {
            return;
        };
        if matches!(
            self.session.status,
            PlaybackStatus::Playing | PlaybackStatus::Paused
        ) {
            self.engine.stop(&id);
        }
        if let Some(handle) = self.registry.get_mut(&id) {
            handle.record.buffering = false;
        }
        self.session.status = PlaybackStatus::Stopped;
    }

    pub(super) fn start_index(&mut self, index: usize) {
        if let Some(track) = self.snapshot.get(index).cloned() {
            self.start_track(track);
        }
    }

    fn toggle_track(&mut self, track: TrackDescriptor) {
        if self.session.active.as_ref() == Some(&track.sound) {
            self.toggle_active();
        } else {
            self.start_track(track);
        }
    }

    /// Playing and paused swap; a stopped track starts again.
    pub(super) fn toggle_active(&mut self) {
        let Some(id) = self.session.active.clone() else {
            return;
        };
        match self.session.status {
            PlaybackStatus::Playing => {
                self.engine.pause(&id);
                self.session.status = PlaybackStatus::Paused;
            }
            PlaybackStatus::Paused => {
                self.engine.resume(&id);
                self.session.status = PlaybackStatus::Playing;
            }
            PlaybackStatus::Stopped | PlaybackStatus::Finished => {
                if let Some(handle) = self.registry.get(&id)
                    && !handle.is_created()
                {
                    // Never made it into the engine: retry from scratch.
                    let track = handle.record.descriptor.clone();
                    self.start_track(track);
                    return;
                }
                if let Some(handle) = self.registry.get_mut(&id) {
                    handle.record.error = false;
                }
                self.registry.begin_run(&id);
                self.engine.play(&id);
                self.session.status = PlaybackStatus::Playing;
            }
        }
    }

    /// Make `track` the active one: the previous sound is stopped and
    /// unloaded first, then the new one is created if needed and played.
    pub(super) fn start_track(&mut self, track: TrackDescriptor) {
        self.stop_active();

        let id = track.sound.clone();
        let created = self.registry.get_or_create(&mut self.engine, &track);
        self.registry.begin_run(&id);
        if let Some(handle) = self.registry.get_mut(&id) {
            handle.record.descriptor = track;
            handle.record.orphaned = false;
            handle.record.buffering = false;
            handle.record.error = created.is_err();
        }
        self.session.active = Some(id.clone());

        match created {
            Ok(_) => {
                debug!(sound = %id, "starting track");
                self.engine.play(&id);
                self.session.status = PlaybackStatus::Playing;
            }
            Err(e) => {
                warn!(sound = %id, error = %e, "cannot create sound");
                self.fail_active();
            }
        }
    }

    /// Stop and unload the active sound, if any.
    pub(super) fn stop_active(&mut self) {
        let Some(id) = self.session.active.take() else {
            return;
        };
        self.engine.stop(&id);
        self.engine.unload(&id);
        if let Some(handle) = self.registry.get_mut(&id) {
            handle.record.buffering = false;
            handle.record.state_tag = None;
        }
        self.session.status = PlaybackStatus::Stopped;
        if self.error_skip.as_ref().is_some_and(|(_, s)| *s == id) {
            self.error_skip = None;
        }
    }

    /// The active sound cannot be played: tag it, stop, and skip ahead
    /// after a short delay.
    pub(super) fn fail_active(&mut self) {
        let Some(id) = self.session.active.clone() else {
            return;
        };
        if let Some(handle) = self.registry.get_mut(&id) {
            handle.record.error = true;
            handle.record.buffering = false;
        }
        self.session.status = PlaybackStatus::Stopped;
        self.record_fault(Fault::LoadFailed(id.clone()));
        let delay = Duration::from_millis(self.settings.timing.error_skip_delay_ms);
        self.error_skip = Some((self.clock.now() + delay, id));
    }

    pub(super) fn active_record(&self) -> Option<&SoundRecord> {
        self.session
            .active
            .as_ref()
            .and_then(|id| self.registry.get(id))
            .map(|h| &h.record)
    }
}
