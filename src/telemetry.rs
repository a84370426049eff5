//! Tracing subscriber setup
//!
//! The library only emits `tracing` events. The process that embeds it calls
//! [`init`] once at startup and keeps the returned [`TelemetryGuard`] alive until
//! shutdown; dropping the guard flushes buffered log lines. Tests use [`LogCapture`]
//! to collect output from a scoped subscriber instead.

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use std::io;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Keeps the background log writer alive; drop it at shutdown to flush
#[must_use = "dropping the guard stops the log writer"]
#[derive(Debug)]
pub struct TelemetryGuard {
    _worker: WorkerGuard,
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over [`LoggingConfig::filter`]. Fails if the filter
/// does not parse or a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<TelemetryGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| Error::config("logging.filter", e.to_string()))?,
    };

    let (writer, worker) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "channel-harvester.log");
            tracing_appender::non_blocking(appender)
        }
        None => tracing_appender::non_blocking(io::stderr()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(config.with_target)
                .with_ansi(config.ansi && config.log_dir.is_none())
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| Error::config("logging", e.to_string()))?;

    Ok(TelemetryGuard { _worker: worker })
}

/// In-memory log sink for a scoped subscriber
#[derive(Clone, Debug, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.lock() {
            Ok(mut buffer) => buffer.extend_from_slice(buf),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(buf),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Create an empty capture
    pub fn new() -> Self {
        Self::default()
    }

    /// Route events on the current thread into this capture until the guard drops
    ///
    /// Captures everything at DEBUG and above, without ANSI colors.
    pub fn install(&self) -> DefaultGuard {
        let buffer = Arc::clone(&self.buffer);
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || CaptureWriter(Arc::clone(&buffer)))
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Everything captured so far
    pub fn contents(&self) -> String {
        let bytes = match self.buffer.lock() {
            Ok(buffer) => buffer.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Whether any captured line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}
