//! Process-wide CPU and memory time series.
//!
//! Fed once per render tick, not per sample. Each series is a fixed-capacity
//! ring that evicts its oldest point.

// CPU percentage is a ratio of microsecond counters
#![allow(clippy::cast_precision_loss)]

use std::collections::VecDeque;
use std::time::Instant;

use crate::aggregation::Session;

/// Bounded series of recent values, oldest first.
#[derive(Debug, Clone)]
pub struct History<T> {
    points: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> History<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { points: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, value: T) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(value);
    }

    #[must_use]
    pub fn latest(&self) -> Option<T> {
        self.points.back().copied()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + '_ {
        self.points.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Derives CPU% and memory readings from successive session snapshots.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    cores: usize,
    last: Option<(Instant, u64)>,
    pub cpu: History<f64>,
    pub memory: History<u64>,
}

impl MetricsTracker {
    #[must_use]
    pub fn new(capacity: usize, cores: usize) -> Self {
        Self {
            cores: cores.max(1),
            last: None,
            cpu: History::new(capacity),
            memory: History::new(capacity),
        }
    }

    /// Take one reading.
    ///
    /// CPU% is the CPU time the session gained since the previous tick over
    /// the wall time that passed, clamped to `[0, 100 * cores]`. Memory is the
    /// resident size when the probe has one, otherwise the memory the
    /// sampler has reported so far. The first tick only sets the baseline and
    /// reports 0%.
    pub fn tick(&mut self, session: &Session, rss: Option<u64>, now: Instant) -> (f64, u64) {
        let cpu_us = session.totals.cpu_us;
        let cpu_pct = match self.last {
            Some((then, prev)) => {
                let wall_us = now.saturating_duration_since(then).as_micros() as f64;
                if wall_us > 0.0 {
                    let pct = cpu_us.saturating_sub(prev) as f64 * 100.0 / wall_us;
                    pct.clamp(0.0, 100.0 * self.cores as f64)
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last = Some((now, cpu_us));

        let memory = rss.unwrap_or(session.totals.memory_bytes);
        self.cpu.push(cpu_pct);
        self.memory.push(memory);
        (cpu_pct, memory)
    }
}
