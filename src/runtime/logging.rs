use std::fs::OpenOptions;
use std::sync::Mutex;

use tapedeck::config::LogSettings;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `TAPEDECK_LOG` is unset.
const DEFAULT_FILTER: &str = "tapedeck=info";

/// Send `tracing` output to the configured log file. The terminal belongs to
/// the UI, so nothing is installed when no file is configured.
pub fn init(settings: &LogSettings) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = &settings.file else {
        return Ok(());
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("TAPEDECK_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;
    Ok(())
}
