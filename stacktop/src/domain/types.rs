//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep process ids, thread ids and the pair that
//! identifies a sampled thread from being mixed up in function signatures.

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;
use stacktop_common::{Metrics, SingleMetric};

/// Process ID as reported by the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread ID as reported by the sampler.
///
/// Interpreter thread ids are often native pointers, so this is 64 bits wide
/// and displayed in hex when it does not look like a kernel tid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Tid(pub u64);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > u64::from(u32::MAX) {
            write!(f, "{:x}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Identifies one sampled thread across all processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadKey {
    pub pid: Pid,
    pub tid: Tid,
}

impl ThreadKey {
    #[must_use]
    pub fn new(pid: u32, tid: u64) -> Self {
        Self { pid: Pid(pid), tid: Tid(tid) }
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid, self.tid)
    }
}

/// Which metric drives percentages, flame widths and value formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileMode {
    /// Wall-clock time
    #[default]
    Wall,
    /// On-CPU time
    Cpu,
    /// Allocated memory
    Memory,
}

impl ProfileMode {
    /// Pick this mode's value out of an accumulator.
    #[must_use]
    pub fn value(self, metrics: &Metrics) -> u64 {
        match self {
            ProfileMode::Wall => metrics.wall_us,
            ProfileMode::Cpu => metrics.cpu_us,
            ProfileMode::Memory => metrics.memory_bytes,
        }
    }

    /// How a single-valued sampler metrics field should be read.
    #[must_use]
    pub fn single_metric(self) -> SingleMetric {
        match self {
            ProfileMode::Memory => SingleMetric::Memory,
            ProfileMode::Wall | ProfileMode::Cpu => SingleMetric::Time,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ProfileMode::Wall => "WALL",
            ProfileMode::Cpu => "CPU",
            ProfileMode::Memory => "MEMORY",
        }
    }

    /// Format a value of this mode's metric for display.
    #[must_use]
    pub fn format(self, value: u64) -> String {
        match self {
            ProfileMode::Memory => fmt_mem(value),
            ProfileMode::Wall | ProfileMode::Cpu => fmt_time(value),
        }
    }
}

/// Format microseconds as `m'ss"`, dropping the minutes when zero.
#[must_use]
pub fn fmt_time(micros: u64) -> String {
    let secs = (micros + 500_000) / 1_000_000;
    let minutes = secs / 60;
    if minutes > 0 {
        format!("{minutes}'{:02}\"", secs % 60)
    } else {
        format!("{:02}\"", secs % 60)
    }
}

/// Format a byte count with a binary unit suffix.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fmt_mem(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "K", "M", "G"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}
