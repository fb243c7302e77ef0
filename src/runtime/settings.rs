use tapedeck::Error;
use tapedeck::config;

/// Settings from the environment and config file. When they cannot be loaded
/// or fail validation the defaults are used and the problem is returned
/// alongside, to be logged once logging is up.
pub fn load_settings() -> (config::Settings, Option<Error>) {
    match config::Settings::load() {
        Ok(s) => match s.validate() {
            Ok(()) => (s, None),
            Err(e) => (config::Settings::default(), Some(e)),
        },
        // Config is optional; failures should not prevent the app from starting.
        Err(e) => (config::Settings::default(), Some(e)),
    }
}
