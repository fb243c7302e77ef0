//! Error types.
//!
//! Setup paths (settings, audio output) return [`Error`]. Once the player is
//! running nothing is surfaced to the host: failures become [`Fault`]s that
//! are logged and turned into state or tag changes.

use thiserror::Error;

use crate::engine::SoundId;

/// Crate-level error for setup and configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Layered configuration could not be built or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Inline TOML settings could not be parsed.
    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// A setting parsed fine but has an unusable value.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a [`crate::engine::SoundEngine`] implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sound {0} is not registered with the engine")]
    UnknownSound(SoundId),

    #[error("cannot create sound {id}: {reason}")]
    CreateFailed { id: SoundId, reason: String },

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("cannot load {url}: {reason}")]
    Load { url: String, reason: String },
}

/// A contained failure. Recorded by the player, never returned to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// An expected control element is absent; its feature is a no-op.
    #[error("control `{0}` not found on the page")]
    MissingControl(String),

    /// The configured container scope matched nothing; the playlist is empty.
    #[error("container `{0}` not found on the page")]
    MissingContainer(String),

    /// The engine could not load or create the sound.
    #[error("sound {0} failed to load")]
    LoadFailed(SoundId),

    /// The active sound vanished from the latest scan.
    #[error("active sound {0} is no longer on the page")]
    Orphaned(SoundId),

    /// A scrub computation produced no usable seek target.
    #[error("scrub position could not be computed")]
    BadGeometry,
}
