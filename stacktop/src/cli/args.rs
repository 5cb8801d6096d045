//! CLI argument definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::domain::ProfileMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SaveFormat {
    /// Collapsed stacks, one line per call path
    #[default]
    Collapsed,
    /// Full call trees as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "stacktop",
    version,
    about = "Live terminal view of stack-sampling profiler output",
    after_help = "\
EXAMPLES:
    stacktop -- austin -i 1ms python app.py     Run a sampler and watch its output
    austin -i 1ms python app.py | stacktop -i -   Read samples from stdin
    stacktop -i run.austin --headless           Summarize a recorded profile"
)]
pub struct Args {
    /// Read samples from FILE ('-' for stdin) instead of running a sampler
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Metric used for percentages and the flame graph
    #[arg(short, long, value_enum, default_value_t = ProfileMode::Wall)]
    pub mode: ProfileMode,

    /// Refresh interval in milliseconds
    #[arg(long, value_name = "MS", default_value = "1000")]
    pub interval_ms: u64,

    /// Hide rows below this %TOTAL (0-100)
    #[arg(short, long, default_value = "0")]
    pub threshold: f64,

    /// Number of points kept in the CPU and memory plots
    #[arg(long, default_value = "120")]
    pub history: usize,

    /// Seconds without samples before the source is shown as stale
    #[arg(long, value_name = "SECS", default_value = "5")]
    pub stale_after: u64,

    /// File format used by the save key
    #[arg(long, value_enum, default_value_t = SaveFormat::Collapsed)]
    pub save_format: SaveFormat,

    /// Directory snapshots are saved into
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub save_dir: PathBuf,

    /// Profiled process to probe for memory and command line
    #[arg(short, long)]
    pub pid: Option<u32>,

    /// Run without TUI and print a summary when the source ends
    #[arg(long)]
    pub headless: bool,

    /// Write logs to FILE (the TUI owns the terminal)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Sampler command to run; its stdout is the sample stream
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
