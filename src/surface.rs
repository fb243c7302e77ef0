//! Control surface sync.
//!
//! [`project`] turns the session into a [`SurfaceState`] without touching the
//! page; [`apply`] writes that state onto the controls, the document and the
//! links of the active sound. Applying the same state twice leaves the page
//! exactly as applying it once.

mod apply;
mod project;

pub use apply::{apply, apply_loading, apply_progress};
pub use project::{ActiveTrack, LinkState, Progress, SurfaceState, format_clock, project};
