//! The sound engine the player drives.
//!
//! Commands are fire-and-forget; an engine reports back only through the
//! [`SoundCallbacks`] it was handed when the sound was created. Each event
//! carries the [`HandleKey`] of the handle that emitted it so the player can
//! drop events from handles that are no longer active.

mod native;
mod types;

pub use native::RodioEngine;
pub use types::*;
