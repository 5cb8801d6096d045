//! Structured error types for stacktop
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Malformed samples have their own type in `stacktop_common`.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid combinations of command-line options.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing sample source: pass --input FILE, --input -, or a sampler command after --")]
    NoSource,

    #[error("Cannot use --input together with a sampler command")]
    ConflictingSources,

    #[error("Threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(f64),

    #[error("Refresh interval must be at least {min}ms, got {got}ms")]
    IntervalTooShort { min: u64, got: u64 },

    #[error("History length must be at least 1")]
    EmptyHistory,
}

/// Failures opening or reading the sample stream.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to start sampler {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sampler {0:?} has no readable stdout")]
    NoStdout(String),

    #[error("Failed to open sample file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures writing a session snapshot. Always shown in the UI, never fatal.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write snapshot: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to serialize snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum TuiError {
    #[error("Terminal error: {0}")]
    TerminalError(String),

    #[error("Render thread panicked")]
    Panicked,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
