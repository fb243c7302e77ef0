use tracing::debug;

use crate::clock::Clock;
use crate::engine::SoundEngine;
use crate::error::Fault;
use crate::page::{ElementId, Listener, Page, closest_with_class};
use crate::scrub::{ScrubCommand, ScrubGeometry, seek_target};

use super::controller::Player;
use super::types::{InputOutcome, PlaybackStatus};

impl<P, E, C> Player<P, E, C>
where
    P: Page,
    E: SoundEngine,
    C: Clock,
{
    /// Pointer pressed at `x` on `target`. Starts a drag when the target is
    /// inside the scrubber and a track is active.
    pub fn begin_drag(&mut self, target: ElementId, x: f64) -> InputOutcome {
        if self.session.drag_active || self.session.active.is_none() {
            return InputOutcome::PassThrough;
        }
        let Some(scrubber) = closest_with_class(&self.page, target, &self.settings.classes.scrubber)
        else {
            return InputOutcome::PassThrough;
        };
        let geometry = ScrubGeometry {
            origin_x: self.page.offset_left(scrubber),
            width: self.page.offset_width(scrubber),
        };

        let seek = self.seek_target_at(x, geometry);
        let playing = self.session.status == PlaybackStatus::Playing;
        let commands = self.scrub.begin(self.clock.now(), geometry, playing, seek);
        self.session.drag_active = true;
        self.bind(Listener::PointerMove);
        debug!(x, playing, "drag started");

        for cmd in commands {
            self.run_scrub(cmd);
        }
        self.sync();
        InputOutcome::Handled
    }

    /// Pointer moved while the button is down. Without an active drag this
    /// just makes sure any drag is over.
    pub fn move_drag(&mut self, x: f64) {
        if !self.session.drag_active {
            self.end_drag();
            return;
        }
        let Some(geometry) = self.scrub.geometry() else {
            return;
        };
        let seek = self.seek_target_at(x, geometry);
        if let Some(cmd) = self.scrub.move_to(self.clock.now(), seek) {
            self.run_scrub(cmd);
        }
    }

    /// Pointer released: issue the last seek and resume unless playback was
    /// paused before the drag started.
    pub fn end_drag(&mut self) -> InputOutcome {
        if !self.session.drag_active {
            return InputOutcome::PassThrough;
        }
        let commands = self.scrub.end();
        self.session.drag_active = false;
        self.unbind(Listener::PointerMove);
        debug!("drag ended");

        for cmd in commands {
            self.run_scrub(cmd);
        }
        if self.scan_deferred {
            self.rescan();
        }
        self.sync();
        InputOutcome::Handled
    }

    /// Seek target for a pointer at `x`, or `None` (recorded as a fault)
    /// when it cannot be computed.
    fn seek_target_at(&mut self, x: f64, geometry: ScrubGeometry) -> Option<u64> {
        let status = self
            .session
            .active
            .as_ref()
            .and_then(|id| self.engine.status(id));
        let estimate = status
            .as_ref()
            .and_then(|s| s.duration_estimate_ms.or(s.duration_ms))
            .unwrap_or(f64::NAN);
        let duration = status.as_ref().and_then(|s| s.duration_ms);

        let target = seek_target(x, geometry, estimate, duration);
        if target.is_none() {
            self.record_fault(Fault::BadGeometry);
        }
        target
    }

    pub(super) fn run_scrub(&mut self, cmd: ScrubCommand) {
        let Some(id) = self.session.active.clone() else {
            return;
        };
        match cmd {
            ScrubCommand::Pause => self.engine.pause(&id),
            ScrubCommand::Seek(ms) => self.engine.set_position(&id, ms),
            ScrubCommand::Resume => {
                self.engine.resume(&id);
                self.session.status = PlaybackStatus::Playing;
            }
        }
    }
}
