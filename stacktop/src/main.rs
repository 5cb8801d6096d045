//! # stacktop - Main Entry Point
//!
//! Supports two operational modes:
//! - **Live TUI** (default): ingestion on the tokio runtime, dashboard on its
//!   own thread
//! - **Headless** (`--headless`): ingest until the source closes or Ctrl-C,
//!   then print a per-thread summary

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use log::info;

use stacktop::aggregation::Aggregator;
use stacktop::cli::{Args, Config, SourceSpec};
use stacktop::domain::{fmt_time, ConfigError, TuiError};
use stacktop::export::{write_summary, SUMMARY_TOP};
use stacktop::logging;
use stacktop::profiling::{IngestionLoop, SampleSource, SharedState, SystemProbe};
use stacktop::tui;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    let args = Args::parse();
    std::process::exit(match start(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn start(args: Args) -> Result<()> {
    let config = Config::from_args(args)?;
    logging::init(!config.headless, config.log_file.as_deref())?;
    run(config)
}

#[tokio::main]
async fn run(config: Config) -> Result<()> {
    // a spawned sampler may only write to our stderr while no TUI is up
    let source = SampleSource::open(&config.source, config.headless)
        .await
        .context("Failed to open sample source")?;
    info!("Reading samples from {}", source.description());

    let mut probe = SystemProbe::new(config.pid);
    let command_line = match &config.source {
        SourceSpec::Command(_) => Some(config.source.describe()),
        SourceSpec::Stdin | SourceSpec::File(_) => probe.command_line(),
    };

    let aggregator = Aggregator::new(Instant::now()).with_command_line(command_line);
    let shared = Arc::new(SharedState::new(aggregator.snapshot()));
    let mut ingest = IngestionLoop::new(aggregator, config.mode, Arc::clone(&shared));

    // Launch TUI in separate thread if not headless
    let (tui_handle, quit_rx) = if config.headless {
        (None, None)
    } else {
        let (quit_tx, quit_rx) = bounded(1);
        let tui_config = config.clone();
        let tui_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("stacktop-tui".to_string())
            .spawn(move || tui::run_live(tui_config, tui_shared, quit_tx, probe))
            .context("Failed to start the render thread")?;
        (Some(handle), Some(quit_rx))
    };

    let reason = ingest.run(source, quit_rx, config.headless).await;

    // Wait for TUI to finish if it was running
    if let Some(handle) = tui_handle {
        match handle.join() {
            Ok(result) => result?,
            Err(_) => return Err(TuiError::Panicked.into()),
        }
    }

    let session = shared.load();
    if config.headless {
        let mut out = io::stdout().lock();
        write_summary(&session, config.mode, config.threshold, SUMMARY_TOP, &mut out)?;
        out.flush()?;
    }

    if !config.quiet {
        eprintln!(
            "\n{}: {}, {} samples ({} invalid), {} threads",
            reason.describe(),
            fmt_time(u64::try_from(session.elapsed().as_micros()).unwrap_or(u64::MAX)),
            session.samples,
            session.invalid,
            session.thread_order().len(),
        );
    }

    Ok(())
}
