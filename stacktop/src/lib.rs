//! # stacktop - live terminal view of stack-sampling profiles
//!
//! stacktop reads the line stream of an out-of-process stack sampler (for
//! example one attached to a Python interpreter), folds every sample into a
//! per-thread call tree and shows the result as a live dashboard: CPU and
//! memory plots, a statistics table or full call tree, and a flame graph.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │             External sampler (command, file or stdin)           │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ P<pid>;T<tid>;<frames> <metrics>
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      stacktop (This Crate)                      │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Ingestion   │──▶│  Aggregator  │──▶│  ArcSwap     │         │
//! │  │   (tokio)    │   │ (call trees) │   │  <Session>   │         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │         ▲                                     │ load            │
//! │         │ quit                                ▼                 │
//! │         │           ┌──────────────┐   ┌──────────────┐         │
//! │         └───────────│     TUI      │◀──│  Snapshot /  │         │
//! │                     │  (ratatui)   │   │ Flame layout │         │
//! │                     └──────────────┘   └──────────────┘         │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐                            │
//! │  │   Metrics    │   │    Export    │                            │
//! │  │ (CPU%, mem)  │   │ (save file)  │                            │
//! │  └──────────────┘   └──────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`profiling`]: sample source, ingestion loop, snapshot publication and
//!   the system probe for the profiled process
//! - [`aggregation`]: call trees, per-thread and per-process state, the
//!   session and the aggregator that owns it
//! - [`analysis`]: metrics tracker, snapshot builder (table and full tree)
//!   and flame graph layout
//! - [`export`]: collapsed-stack and JSON snapshots, headless summary
//! - [`tui`]: dashboard, key bindings and the RUNNING/PAUSED state machine
//! - [`cli`]: command-line parsing and validated configuration
//! - [`domain`]: shared types and error enums
//! - [`logging`]: logger setup
//!
//! ## Typical Usage
//!
//! ```bash
//! # Spawn a sampler and watch its output
//! stacktop -- austin python app.py
//!
//! # Replay a recording, CPU time instead of wall time
//! stacktop --input samples.txt --mode cpu
//!
//! # Pipe in, print a summary when the stream ends
//! austin -p 4242 | stacktop --input - --headless
//! ```
//!
//! ## Key Concepts
//!
//! - **Own / total**: time (or memory) spent in a frame itself, versus in the
//!   frame and everything it called
//! - **Threshold**: minimum `%TOTAL` for a row to be shown
//! - **Snapshot**: an immutable published copy of the session; the
//!   dashboard never sees a half-applied sample

pub mod aggregation;
pub mod analysis;
pub mod cli;
pub mod domain;
pub mod export;
pub mod logging;
pub mod profiling;
pub mod tui;
