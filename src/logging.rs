use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::SongError;

/// Sends tracing output to `path`, the terminal belongs to the UI.
/// The level comes from `RUST_LOG` and defaults to info.
pub fn init_logging(path: &Path) -> Result<(), SongError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| SongError::LoadingFailed(format!("Failed to setup logging: {e}")))
}
