//! Process-wide logging for SmartShard binaries.
//!
//! Library crates only emit through `tracing`; binaries call [`init`] exactly
//! once at startup. The subscriber lives for the rest of the process.
//!
//! ```no_run
//! use smartshard_logging::LogConfig;
//!
//! smartshard_logging::init(&LogConfig::default().with_file("smartshard.log")).unwrap();
//! tracing::info!("ready");
//! ```

mod rotate;

use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use rotate::RotatingFile;

/// Default rotation size (5 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Default number of rotated backups kept.
pub const DEFAULT_BACKUPS: usize = 5;

/// Result type for logging setup.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while installing the subscriber.
#[derive(Debug, Error)]
pub enum Error {
    /// The log file could not be opened.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The filter directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("logging already initialised")]
    AlreadyInitialised,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directives used when `RUST_LOG` is unset
    pub filter: String,
    /// Log to stderr
    pub console: bool,
    /// Log to a size-rotated file
    pub file: Option<PathBuf>,
    /// Rotate once the file would exceed this size
    pub max_file_bytes: u64,
    /// Rotated files to keep
    pub backups: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "smartshard=info".to_owned(),
            console: true,
            file: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            backups: DEFAULT_BACKUPS,
        }
    }
}

impl LogConfig {
    /// Set the fallback filter directives.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Enable or disable console output.
    #[must_use]
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Also write to a rotated log file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set rotation size and backup count.
    #[must_use]
    pub fn with_rotation(mut self, max_file_bytes: u64, backups: usize) -> Self {
        self.max_file_bytes = max_file_bytes;
        self.backups = backups;
        self
    }

    /// Resolve the filter: `RUST_LOG` wins, then the configured directives.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(&self.filter)?),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails with [`Error::AlreadyInitialised`] if a subscriber is already set.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;

    let file_layer = match &config.file {
        Some(path) => {
            let writer = RotatingFile::open(path, config.max_file_bytes, config.backups)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(writer)))
        }
        None => None,
    };
    let console_layer = config
        .console
        .then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| Error::AlreadyInitialised)?;

    tracing::debug!(file = ?config.file, console = config.console, "Logging initialised");
    Ok(())
}
