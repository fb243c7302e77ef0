//! Configuration loader and schema types.
//!
//! This module exposes the settings schema (player options, timing windows,
//! CSS tag names and the demo binary's sections) and helpers to load them
//! from disk, the environment or an inline TOML document.

mod load;
mod schema;

pub use load::{default_config_path, resolve_config_path};
pub use schema::*;
