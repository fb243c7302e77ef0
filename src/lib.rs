//! tapedeck: turn the audio links of a page into a navigable playlist.
//!
//! The controller sits between two collaborators: a [`page::Page`] that
//! exposes the document (elements, classes, attributes, listeners) and a
//! [`engine::SoundEngine`] that loads and plays sounds. The [`player::Player`]
//! owns the playback session and keeps exactly one track active, re-deriving
//! the playlist from the page whenever it changes.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod page;
pub mod player;
pub mod registry;
pub mod scanner;
pub mod scrub;
pub mod surface;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use config::Settings;
pub use engine::{RodioEngine, SoundEngine, SoundId};
pub use error::{EngineError, Error, Fault};
pub use page::{ElementId, MemoryPage, Page};
pub use player::{Input, InputOutcome, PlaybackStatus, Player};
