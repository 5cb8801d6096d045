//! Collapsed-stack line decoder.
//!
//! ```text
//! # python: 3.11.4                                  metadata
//! P4317;T7ffb7f5ea740;app.py:<module>:1;app.py:work:9 1034
//! P4317;T1:4318;app.py:<module>:1 210,1,-512        time,idle,memory
//! ```
//!
//! Frames are written outermost first; [`SampleRecord::stack`] stores them
//! innermost first, so they are reversed here.

use crate::{Frame, MetricDeltas, SampleError, SampleRecord};

/// How to read a metrics field that carries a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleMetric {
    /// Microseconds, counted as both wall and CPU time
    #[default]
    Time,
    /// Bytes allocated
    Memory,
}

/// One decoded line of sampler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLine {
    Sample(SampleRecord),
    Metadata { key: String, value: String },
    Blank,
}

/// Decode a single line.
///
/// # Errors
/// Returns a [`SampleError`] describing the first malformed field.
pub fn parse_line(raw: &str, single: SingleMetric) -> Result<SourceLine, SampleError> {
    let line = raw.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(SourceLine::Blank);
    }
    if let Some(meta) = line.strip_prefix('#') {
        let (key, value) = meta.split_once(':').unwrap_or((meta, ""));
        return Ok(SourceLine::Metadata {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        });
    }

    let (head, metrics) =
        line.rsplit_once(' ').ok_or_else(|| SampleError::MissingMetrics(line.to_string()))?;

    let mut fields = head.split(';');
    let pid = fields
        .next()
        .and_then(|p| p.strip_prefix('P'))
        .and_then(|p| p.parse::<u32>().ok())
        .ok_or_else(|| SampleError::MissingPid(line.to_string()))?;
    let tid = fields
        .next()
        .and_then(|t| t.strip_prefix('T'))
        .and_then(parse_tid)
        .ok_or_else(|| SampleError::MissingTid(line.to_string()))?;

    let mut stack =
        fields.filter(|f| !f.is_empty()).map(parse_frame).collect::<Result<Vec<_>, _>>()?;
    stack.reverse();

    let (deltas, stack_ended) = parse_metrics(metrics, single)?;

    Ok(SourceLine::Sample(SampleRecord { pid, tid, stack, deltas: Some(deltas), stack_ended }))
}

/// Thread ids come as decimal, bare hex, or `<interpreter>:<thread>`.
fn parse_tid(field: &str) -> Option<u64> {
    let tid = field.rsplit(':').next()?;
    tid.parse::<u64>().ok().or_else(|| u64::from_str_radix(tid, 16).ok())
}

/// `<file>:<function>:<line>`; the file part may itself contain colons.
fn parse_frame(field: &str) -> Result<Frame, SampleError> {
    let mut parts = field.rsplitn(3, ':');
    let (Some(line), Some(function), Some(file)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(SampleError::InvalidFrame(field.to_string()));
    };
    let line = line
        .trim_start_matches('L')
        .parse::<u32>()
        .map_err(|_| SampleError::InvalidFrame(field.to_string()))?;
    Ok(Frame::new(function, file, line))
}

fn parse_metrics(field: &str, single: SingleMetric) -> Result<(MetricDeltas, bool), SampleError> {
    let value = |v: &str| {
        v.trim().parse::<i64>().map_err(|_| SampleError::InvalidMetric { value: v.to_string() })
    };

    let parts: Vec<&str> = field.split(',').collect();
    match parts.as_slice() {
        [single_value] => {
            let v = value(*single_value)?;
            let deltas = match single {
                SingleMetric::Time => MetricDeltas { wall_us: v, cpu_us: v, memory_bytes: 0 },
                SingleMetric::Memory => MetricDeltas { memory_bytes: v, ..MetricDeltas::default() },
            };
            Ok((deltas, false))
        }
        [time, idle, memory] => {
            let time = value(*time)?;
            let idle = value(*idle)? != 0;
            let memory = value(*memory)?;
            let cpu = if idle { 0 } else { time };
            Ok((MetricDeltas { wall_us: time, cpu_us: cpu, memory_bytes: memory }, idle))
        }
        _ => Err(SampleError::InvalidMetric { value: field.to_string() }),
    }
}
