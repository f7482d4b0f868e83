//! Telemetry and logging initialization.
//!
//! Sets up structured logging with tracing, pretty or JSON, to stderr or a
//! file.

use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

// The non-blocking writer flushes when its guard drops, so it lives for the
// whole process.
static LOG_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(None);

/// Initialize logging from the `[logging]` config section.
pub fn init_from_config(config: &LoggingConfig) -> anyhow::Result<()> {
    match &config.log_file {
        Some(path) => init_telemetry_with_file(&config.level, config.format, path),
        None => init_telemetry(&config.level, config.format),
    }
}

/// Initialize logging to stderr.
pub fn init_telemetry(log_level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_level)?;
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

/// Initialize logging with file output.
pub fn init_telemetry_with_file(
    log_level: &str,
    format: LogFormat,
    log_file: &std::path::Path,
) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_level)?;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(non_blocking))
            .try_init()?,
        LogFormat::Pretty => registry
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .try_init()?,
    }

    if let Ok(mut g) = LOG_GUARD.lock() {
        *g = Some(guard);
    }

    Ok(())
}
