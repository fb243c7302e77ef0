use tracing::debug;

use crate::clock::Clock;
use crate::engine::{ReadyState, SoundEngine, SoundEvent, SoundEventKind};
use crate::page::Page;
use crate::surface::{self, Progress};

use super::controller::Player;
use super::types::PlaybackStatus;

impl<P, E, C> Player<P, E, C>
where
    P: Page,
    E: SoundEngine,
    C: Clock,
{
    /// Apply every engine callback queued since the last call.
    pub fn pump_events(&mut self) {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            changed |= self.on_event(event);
        }
        if changed {
            self.sync();
        }
    }

    /// Returns whether the session changed.
    fn on_event(&mut self, event: SoundEvent) -> bool {
        let Some(id) = self.session.active.clone() else {
            debug!(?event, "no active sound, event dropped");
            return false;
        };
        if !self.registry.get(&id).is_some_and(|h| h.owns(&event)) {
            debug!(?event, active = %id, "stale event dropped");
            return false;
        }

        match event.kind {
            SoundEventKind::Play | SoundEventKind::Resume => {
                if self.session.drag_active {
                    return false;
                }
                self.session.status = PlaybackStatus::Playing;
                true
            }
            SoundEventKind::Pause => {
                if self.session.drag_active {
                    return false;
                }
                self.session.status = PlaybackStatus::Paused;
                true
            }
            // Stops are always issued by a transition that already updated
            // the status.
            SoundEventKind::Stop => false,
            SoundEventKind::Finish => {
                self.on_finish();
                true
            }
            SoundEventKind::WhilePlaying => {
                if let Some(status) = self.engine.status(&id) {
                    let progress = Progress::from_status(&status);
                    surface::apply_progress(&mut self.page, &self.controls, &progress);
                }
                false
            }
            SoundEventKind::WhileLoading => {
                if let Some(status) = self.engine.status(&id) {
                    surface::apply_loading(&mut self.page, &self.controls, status.loaded_fraction());
                }
                false
            }
            SoundEventKind::BufferChange => {
                let Some(status) = self.engine.status(&id) else {
                    return false;
                };
                if status.ready_state == ReadyState::Failed {
                    self.fail_active();
                } else if let Some(handle) = self.registry.get_mut(&id) {
                    handle.record.buffering = status.is_buffering;
                }
                true
            }
        }
    }

    fn on_finish(&mut self) {
        self.session.status = PlaybackStatus::Finished;
        if let Some(handle) = self
            .session
            .active
            .as_ref()
            .and_then(|id| self.registry.get_mut(id))
        {
            handle.record.buffering = false;
        }

        let orphaned = self.active_record().is_some_and(|r| r.orphaned);
        if self.settings.player.play_next && !orphaned {
            self.advance(true);
        }
        if self.session.status == PlaybackStatus::Finished {
            self.session.status = PlaybackStatus::Stopped;
        }
    }
}
