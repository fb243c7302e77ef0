//! Drag-to-seek on the scrubber.
//!
//! The controller is pure bookkeeping: it decides which engine commands a
//! drag produces and when, and leaves issuing them to the player. Seeks are
//! throttled on the trailing edge so a burst of pointer moves collapses into
//! a single `set_position`.

use std::time::{Duration, Instant};

/// Position and width of the scrub control, in page pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScrubGeometry {
    pub origin_x: f64,
    pub width: f64,
}

/// Seek target in milliseconds for a pointer at `pointer_x`.
///
/// `None` when the result is not a number: a zero-width control or an
/// unknown duration. The target never exceeds `duration_ms` when that is
/// known.
pub fn seek_target(
    pointer_x: f64,
    geometry: ScrubGeometry,
    estimate_ms: f64,
    duration_ms: Option<f64>,
) -> Option<u64> {
    let usable_width = geometry.width.is_finite() && geometry.width > 0.0;
    if !usable_width || !estimate_ms.is_finite() || !pointer_x.is_finite() {
        return None;
    }
    let offset = (pointer_x - geometry.origin_x).clamp(0.0, geometry.width);
    let mut target = (offset / geometry.width * estimate_ms).floor();
    if let Some(duration) = duration_ms.filter(|d| d.is_finite()) {
        target = target.min(duration);
    }
    (target.is_finite() && target >= 0.0).then_some(target as u64)
}

/// Trailing-edge throttle for seek commands.
#[derive(Debug, Clone)]
pub struct SeekThrottle {
    interval: Duration,
    last_offer: Option<Instant>,
    pending: Option<(Instant, u64)>,
}

impl SeekThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_offer: None,
            pending: None,
        }
    }

    /// Offer a target. Returns it when it may be issued right away, i.e.
    /// the previous offer is older than the interval; otherwise it replaces
    /// any pending target and waits for [`SeekThrottle::take_due`].
    pub fn offer(&mut self, now: Instant, target: u64) -> Option<u64> {
        let quiet = self
            .last_offer
            .is_none_or(|last| now.duration_since(last) > self.interval);
        self.last_offer = Some(now);
        if quiet {
            self.pending = None;
            Some(target)
        } else {
            self.pending = Some((now + self.interval, target));
            None
        }
    }

    /// Queue `target` as the trailing seek without issuing anything now.
    pub fn defer(&mut self, now: Instant, target: u64) {
        self.last_offer = Some(now);
        self.pending = Some((now + self.interval, target));
    }

    /// Note an offer that produced no target, so the throttle window still
    /// starts from it.
    pub fn touch(&mut self, now: Instant) {
        self.last_offer = Some(now);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(at, _)| at)
    }

    pub fn take_due(&mut self, now: Instant) -> Option<u64> {
        match self.pending {
            Some((at, target)) if now >= at => {
                self.pending = None;
                Some(target)
            }
            _ => None,
        }
    }

    /// Take the pending target regardless of its deadline.
    pub fn flush(&mut self) -> Option<u64> {
        self.pending.take().map(|(_, target)| target)
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.last_offer = None;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScrubCommand {
    Pause,
    Seek(u64),
    Resume,
}

/// State of one drag on the scrubber.
#[derive(Debug, Clone)]
pub struct ScrubController {
    throttle: SeekThrottle,
    geometry: Option<ScrubGeometry>,
    resume_on_release: bool,
}

impl ScrubController {
    pub fn new(interval: Duration) -> Self {
        Self {
            throttle: SeekThrottle::new(interval),
            geometry: None,
            resume_on_release: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn geometry(&self) -> Option<ScrubGeometry> {
        self.geometry
    }

    /// Start a drag. Playback is paused only if it was playing, and only
    /// then is it resumed on release. The pointer's position becomes the
    /// trailing seek.
    pub fn begin(
        &mut self,
        now: Instant,
        geometry: ScrubGeometry,
        playing: bool,
        target: Option<u64>,
    ) -> Vec<ScrubCommand> {
        self.geometry = Some(geometry);
        self.resume_on_release = playing;
        self.throttle.clear();
        match target {
            Some(t) => self.throttle.defer(now, t),
            None => self.throttle.touch(now),
        }
        if playing {
            vec![ScrubCommand::Pause]
        } else {
            Vec::new()
        }
    }

    /// Pointer moved to a position worth `target`. `None` targets are
    /// discarded but still count against the throttle window.
    pub fn move_to(&mut self, now: Instant, target: Option<u64>) -> Option<ScrubCommand> {
        if !self.is_dragging() {
            return None;
        }
        match target {
            Some(t) => self.throttle.offer(now, t).map(ScrubCommand::Seek),
            None => {
                self.throttle.touch(now);
                None
            }
        }
    }

    /// Fire the trailing seek once its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Option<ScrubCommand> {
        self.throttle.take_due(now).map(ScrubCommand::Seek)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    /// Finish the drag: flush the trailing seek, then resume if the drag
    /// paused playback.
    pub fn end(&mut self) -> Vec<ScrubCommand> {
        if !self.is_dragging() {
            return Vec::new();
        }
        let mut out = Vec::new();
        if let Some(t) = self.throttle.flush() {
            out.push(ScrubCommand::Seek(t));
        }
        if self.resume_on_release {
            out.push(ScrubCommand::Resume);
        }
        self.cancel();
        out
    }

    /// Drop the drag without issuing anything.
    pub fn cancel(&mut self) {
        self.geometry = None;
        self.resume_on_release = false;
        self.throttle.clear();
    }
}
