//! Time source for the player's timers.
//!
//! The debounced rescan, the trailing scrub seek and the error skip are all
//! stored as deadlines and fired from [`crate::player::Player::tick`], so the
//! host decides how often to poll and tests can drive time by hand.

use std::time::Instant;

pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
