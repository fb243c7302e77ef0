use std::{env, path::PathBuf};

use crate::error::Error;

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `TAPEDECK__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, Error> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("TAPEDECK")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Parse settings from an inline TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), Error> {
        if self.timing.mutation_debounce_ms == 0 {
            return Err(Error::InvalidSetting(
                "timing.mutation_debounce_ms must be >= 1".to_string(),
            ));
        }
        if self.timing.scrub_throttle_ms == 0 {
            return Err(Error::InvalidSetting(
                "timing.scrub_throttle_ms must be >= 1".to_string(),
            ));
        }
        if let Some((name, _)) = self
            .classes
            .named()
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(Error::InvalidSetting(format!("classes.{name} must not be empty")));
        }
        if self.player.controls_markup.wrapper_class.trim().is_empty() {
            return Err(Error::InvalidSetting(
                "player.controls_markup.wrapper_class must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the config path from `TAPEDECK_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("TAPEDECK_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/tapedeck/config.toml`
/// or `~/.config/tapedeck/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else if let Some(home) = env::var_os("HOME") {
        Some(PathBuf::from(home).join(".config"))
    } else {
        None
    };

    config_home.map(|d| d.join("tapedeck").join("config.toml"))
}
