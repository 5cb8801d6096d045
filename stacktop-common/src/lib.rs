//! # Shared Sample Structures (Sampler ↔ Aggregator)
//!
//! Defines the typed boundary between the external stack sampler and the
//! aggregation engine. Everything the core consumes arrives as a
//! [`SampleRecord`]; the text decoder in [`line`] is a thin adapter for the
//! sampler's collapsed-stack output.
//!
//! ## Key Types
//!
//! - [`Frame`] - `(function, file, line)` triple, structural equality
//! - [`MetricDeltas`] - raw per-sample deltas as reported by the sampler
//! - [`Metrics`] - validated, additive metric accumulator
//! - [`SampleRecord`] - one observation of a thread's stack
//! - [`SampleError`] - malformed input (dropped and counted, never fatal)

use std::fmt;
use std::ops::AddAssign;
use std::sync::Arc;

use thiserror::Error;

pub mod line;

pub use line::{parse_line, SingleMetric, SourceLine};

// ============================================================================
// Frames
// ============================================================================

/// A resolved source location on a call stack.
///
/// Two frames with the same triple are the same call-tree node, regardless of
/// which sample they came from. Strings are shared so that cloning a call tree
/// (copy-on-write publication) never copies names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Frame {
    pub function: Arc<str>,
    pub file: Arc<str>,
    pub line: u32,
}

impl Frame {
    pub fn new(function: &str, file: &str, line: u32) -> Self {
        Self { function: Arc::from(function), file: Arc::from(file), line }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.function, self.file, self.line)
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Metric deltas exactly as the sampler reported them.
///
/// Signed so that a misbehaving sampler's negative values can be detected and
/// rejected by [`SampleRecord::validate`] instead of wrapping around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricDeltas {
    /// Elapsed wall-clock time in microseconds
    pub wall_us: i64,
    /// On-CPU time in microseconds
    pub cpu_us: i64,
    /// Memory allocated in bytes
    pub memory_bytes: i64,
}

/// Additive metric accumulator used for both own and total statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Metrics {
    /// Number of samples folded in
    pub samples: u64,
    pub wall_us: u64,
    pub cpu_us: u64,
    pub memory_bytes: u64,
}

impl Metrics {
    /// Metrics contributed by one sample with no reported deltas.
    #[must_use]
    pub fn one_sample() -> Self {
        Self { samples: 1, ..Self::default() }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for Metrics {
    fn add_assign(&mut self, rhs: Self) {
        self.samples += rhs.samples;
        self.wall_us += rhs.wall_us;
        self.cpu_us += rhs.cpu_us;
        self.memory_bytes += rhs.memory_bytes;
    }
}

// ============================================================================
// Sample Record
// ============================================================================

/// One observation of a thread's call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRecord {
    pub pid: u32,
    pub tid: u64,
    /// Call stack, **innermost frame first**.
    pub stack: Vec<Frame>,
    /// `None` when the sampler reported no metrics; the sample still counts.
    pub deltas: Option<MetricDeltas>,
    /// The thread was idle when sampled (its stack ended).
    pub stack_ended: bool,
}

impl SampleRecord {
    /// Iterate the stack from the thread entry point down to the leaf.
    pub fn outer_to_inner(&self) -> impl DoubleEndedIterator<Item = &Frame> {
        self.stack.iter().rev()
    }

    /// Check the record and convert its deltas into additive [`Metrics`].
    ///
    /// # Errors
    /// Returns [`SampleError::NegativeMetric`] when any delta is below zero.
    pub fn validate(&self) -> Result<Metrics, SampleError> {
        let Some(d) = self.deltas else {
            return Ok(Metrics::one_sample());
        };
        let non_negative = |name: &'static str, value: i64| {
            u64::try_from(value).map_err(|_| SampleError::NegativeMetric { metric: name, value })
        };
        Ok(Metrics {
            samples: 1,
            wall_us: non_negative("time", d.wall_us)?,
            cpu_us: non_negative("cpu", d.cpu_us)?,
            memory_bytes: non_negative("memory", d.memory_bytes)?,
        })
    }
}

/// Reasons a sample is rejected. None of them are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("missing process id in {0:?}")]
    MissingPid(String),

    #[error("missing thread id in {0:?}")]
    MissingTid(String),

    #[error("missing metrics in {0:?}")]
    MissingMetrics(String),

    #[error("invalid metric value {value:?}")]
    InvalidMetric { value: String },

    #[error("negative {metric} delta: {value}")]
    NegativeMetric { metric: &'static str, value: i64 },

    #[error("invalid frame {0:?}")]
    InvalidFrame(String),

    #[error("line is not valid UTF-8 (first bad byte at {valid_up_to})")]
    NotUtf8 { valid_up_to: usize },
}
