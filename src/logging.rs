//! Logging setup
//!
//! Two layers: a terse console layer on stderr whose level follows `-v`
//! (or `RUST_LOG`), and a debug-level file layer. The log file is only
//! known once the output directory is resolved, so the file layer writes
//! into a [`LogFile`] handle that can be attached after initialization.
//! Events logged before that are dropped from the file.

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::util::paths::{ensure_counted_path, ensure_dir, logs_dir};

/// Name of the per-run log file under `_logs/<app_id>/`
pub const LOG_FILE_NAME: &str = "main.log";

/// Console level for a `-v` count
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Colors only for a terminal, and never with `NO_COLOR` set
fn console_ansi(is_terminal: bool, no_color: Option<&std::ffi::OsStr>) -> bool {
    is_terminal && no_color.is_none_or(|v| v.is_empty())
}

/// Install the global subscriber and return the file handle.
///
/// Calling this twice leaves the first subscriber in place.
pub fn init(verbosity: u8) -> LogFile {
    let log_file = LogFile::default();

    let console_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::default().add_directive(level_for(verbosity).into()),
    };
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(console_ansi(
            io::stderr().is_terminal(),
            std::env::var_os("NO_COLOR").as_deref(),
        ))
        .without_time()
        .with_target(false)
        .with_filter(console_filter);

    let file_filter = Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), LevelFilter::DEBUG)
        .with_default(LevelFilter::INFO);
    let file = fmt::layer()
        .with_writer(log_file.clone())
        .with_ansi(false)
        .with_filter(file_filter);

    if let Err(e) = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
    {
        tracing::debug!(error = %e, "Logging already initialized");
    }

    log_file
}

/// Late-bound log file shared with the file layer
#[derive(Clone, Default)]
pub struct LogFile {
    inner: Arc<Mutex<Option<File>>>,
}

impl LogFile {
    /// Start writing to `path`, replacing any previous file
    pub fn attach(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let file = File::create(path)?;
        *self.lock() = Some(file);
        tracing::debug!(path = %path.display(), "Logging to file");
        Ok(())
    }

    /// Attach `<out_dir>/_logs/<app_id>/main.log`, counting up to
    /// `main-001.log` and so on unless `overwrite` is set
    pub fn attach_run(&self, out_dir: &Path, app_id: &str, overwrite: bool) -> io::Result<PathBuf> {
        let path = logs_dir(out_dir, app_id).join(LOG_FILE_NAME);
        let path = if overwrite {
            path
        } else {
            ensure_counted_path(&path, "-", true)?
        };
        self.attach(&path)?;
        Ok(path)
    }

    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub struct LogFileWriter {
    inner: Arc<Mutex<Option<File>>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
