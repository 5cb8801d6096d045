//! Logger initialisation
//!
//! `env_logger` behind the `log` facade. While the TUI owns the terminal,
//! log lines would tear the screen, so they either go to `--log-file` or are
//! off unless `RUST_LOG` asks for them explicitly.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};

/// Default filter when `RUST_LOG` is not set.
#[must_use]
pub fn default_filter(tui_active: bool, log_file: Option<&Path>) -> &'static str {
    if tui_active && log_file.is_none() {
        "off"
    } else {
        "warn"
    }
}

/// Install the global logger.
///
/// # Errors
/// Fails if the log file cannot be created or a logger is already installed.
pub fn init(tui_active: bool, log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        Builder::from_env(Env::default().default_filter_or(default_filter(tui_active, log_file)));
    builder.format_timestamp_millis();

    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("Logger already initialized")
}
