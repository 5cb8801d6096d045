//! Command-line parsing and validated runtime configuration

pub mod args;

pub use args::{Args, SaveFormat};

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{ConfigError, ProfileMode};

/// Shortest refresh interval accepted.
pub const MIN_INTERVAL_MS: u64 = 50;

/// Where samples come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Stdin,
    File(PathBuf),
    /// Program and arguments of the sampler to spawn
    Command(Vec<String>),
}

impl SourceSpec {
    /// Human-readable description for the header and logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            SourceSpec::Stdin => "<stdin>".to_string(),
            SourceSpec::File(path) => path.display().to_string(),
            SourceSpec::Command(argv) => argv.join(" "),
        }
    }

    /// Samples describe processes running on this host now. A recording
    /// may name pids that are gone or reused by something else.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !matches!(self, SourceSpec::File(_))
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceSpec,
    pub mode: ProfileMode,
    pub interval: Duration,
    /// Initial %TOTAL threshold, 0 to 100
    pub threshold: f64,
    pub history: usize,
    pub stale_after: Duration,
    pub save_format: SaveFormat,
    pub save_dir: PathBuf,
    pub pid: Option<u32>,
    pub headless: bool,
    pub log_file: Option<PathBuf>,
    pub quiet: bool,
}

impl Config {
    /// Check the parsed arguments and resolve the sample source.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for missing or conflicting sources and for
    /// out-of-range numbers.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let source = match (args.input, args.command.is_empty()) {
            (Some(_), false) => return Err(ConfigError::ConflictingSources),
            (Some(path), true) if path.as_os_str() == "-" => SourceSpec::Stdin,
            (Some(path), true) => SourceSpec::File(path),
            (None, false) => SourceSpec::Command(args.command),
            (None, true) => return Err(ConfigError::NoSource),
        };

        if !(0.0..=100.0).contains(&args.threshold) {
            return Err(ConfigError::InvalidThreshold(args.threshold));
        }
        if args.interval_ms < MIN_INTERVAL_MS {
            return Err(ConfigError::IntervalTooShort { min: MIN_INTERVAL_MS, got: args.interval_ms });
        }
        if args.history == 0 {
            return Err(ConfigError::EmptyHistory);
        }

        Ok(Self {
            source,
            mode: args.mode,
            interval: Duration::from_millis(args.interval_ms),
            threshold: args.threshold,
            history: args.history,
            stale_after: Duration::from_secs(args.stale_after),
            save_format: args.save_format,
            save_dir: args.save_dir,
            pid: args.pid,
            headless: args.headless,
            log_file: args.log_file,
            quiet: args.quiet,
        })
    }
}
