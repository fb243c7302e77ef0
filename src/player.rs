//! The playback state machine.
//!
//! [`Player`] owns the page, the engine, the latest [`Snapshot`] and the
//! [`Session`]. Every public entry point runs its transition to completion
//! and then syncs the control surface once.
//!
//! Engine callbacks arrive on a channel and are applied by
//! [`Player::pump_events`]; events from a handle that is no longer the
//! active one are dropped. Timers (debounced rescan, trailing scrub seek,
//! error skip) are deadlines fired by [`Player::tick`].
//!
//! [`Snapshot`]: crate::scanner::Snapshot

mod callbacks;
mod controller;
mod drag;
mod transport;
mod types;

pub use controller::Player;
pub use types::{Controls, Input, InputOutcome, PlaybackStatus, PointerButton, Session};

#[cfg(test)]
mod tests;
