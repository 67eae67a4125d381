//! Log setup: timestamped lines to the console and appended to a log file.

use crate::error::{CitationError, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Local wall-clock timestamps with millisecond precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the level chosen by `debug`. The file layer never
/// emits ANSI escapes.
pub fn init(log_file: &Path, debug: bool) -> Result<()> {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_timer(LocalTimer).with_target(true))
        .with(
            fmt::layer()
                .with_timer(LocalTimer)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| CitationError::Config(format!("failed to install logger: {}", e)))
}
