//! The document the player is embedded in.
//!
//! [`Page`] is the only door to the document: element lookup, class tags,
//! attributes, geometry and listener (un)binding. [`MemoryPage`] is an
//! in-memory document used by the tests and the demo binary.

mod memory;
mod model;

pub use memory::MemoryPage;
pub use model::*;
