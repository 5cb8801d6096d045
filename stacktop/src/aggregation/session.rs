//! Session state and the aggregator that folds samples into it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use stacktop_common::{Frame, Metrics, SampleError, SampleRecord};

use super::call_tree::CallTreeNode;
use crate::domain::{Pid, ThreadKey, Tid};

/// Log the first malformed sample and then one in this many.
const WARN_EVERY: u64 = 1000;

/// Everything known about one sampled thread.
#[derive(Debug, Clone)]
pub struct ThreadState {
    pub key: ThreadKey,
    pub root: Arc<CallTreeNode>,
    /// Most recent stack, outermost frame first
    pub last_stack: Arc<[Frame]>,
    pub samples: u64,
    pub last_update: Instant,
    /// The last sample reported the thread as idle
    pub idle: bool,
}

impl ThreadState {
    fn new(key: ThreadKey, now: Instant) -> Self {
        Self {
            key,
            root: Arc::new(CallTreeNode::root()),
            last_stack: Arc::from(Vec::new()),
            samples: 0,
            last_update: now,
            idle: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessState {
    pub pid: Pid,
    /// Fixed when the process is first seen
    pub command_line: Option<Arc<str>>,
    pub interpreter: Option<Arc<str>>,
    threads: HashMap<Tid, Arc<ThreadState>>,
}

impl ProcessState {
    #[must_use]
    pub fn thread(&self, tid: Tid) -> Option<&ThreadState> {
        self.threads.get(&tid).map(AsRef::as_ref)
    }

    /// Threads sorted by id.
    #[must_use]
    pub fn threads(&self) -> Vec<&ThreadState> {
        let mut threads: Vec<&ThreadState> = self.threads.values().map(AsRef::as_ref).collect();
        threads.sort_by_key(|t| t.key.tid);
        threads
    }
}

/// All aggregated state for one run.
///
/// Cloning is cheap: thread states and call trees are shared and only copied
/// when the aggregator next writes to them.
#[derive(Debug, Clone)]
pub struct Session {
    processes: BTreeMap<Pid, ProcessState>,
    /// Threads in first-seen order
    thread_order: Vec<ThreadKey>,
    /// Sampler metadata (`# key: value` lines), in arrival order
    metadata: Vec<(String, String)>,
    /// Accepted samples
    pub samples: u64,
    /// Dropped malformed samples
    pub invalid: u64,
    /// Sum of every accepted sample's metrics
    pub totals: Metrics,
    started_at: Instant,
    pub last_sample_at: Option<Instant>,
    stopped_at: Option<Instant>,
}

impl Session {
    #[must_use]
    pub fn new(started_at: Instant) -> Self {
        Self {
            processes: BTreeMap::new(),
            thread_order: Vec::new(),
            metadata: Vec::new(),
            samples: 0,
            invalid: 0,
            totals: Metrics::default(),
            started_at,
            last_sample_at: None,
            stopped_at: None,
        }
    }

    #[must_use]
    pub fn thread_order(&self) -> &[ThreadKey] {
        &self.thread_order
    }

    #[must_use]
    pub fn thread(&self, key: ThreadKey) -> Option<&ThreadState> {
        self.processes.get(&key.pid)?.thread(key.tid)
    }

    #[must_use]
    pub fn process(&self, pid: Pid) -> Option<&ProcessState> {
        self.processes.get(&pid)
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessState> {
        self.processes.values()
    }

    #[must_use]
    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// The source has closed; no more samples will arrive.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Time since start, frozen once the source stops.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.stopped_at.unwrap_or_else(Instant::now).saturating_duration_since(self.started_at)
    }

    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Share of received samples that were malformed, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn error_rate(&self) -> f64 {
        let seen = self.samples + self.invalid;
        if seen == 0 {
            0.0
        } else {
            self.invalid as f64 * 100.0 / seen as f64
        }
    }

    /// Whether nothing has arrived for at least `grace`.
    #[must_use]
    pub fn is_stale(&self, grace: Duration, now: Instant) -> bool {
        let last = self.last_sample_at.unwrap_or(self.started_at);
        now.saturating_duration_since(last) >= grace
    }
}

/// Folds samples into a [`Session`]. Owned by the ingestion loop.
#[derive(Debug)]
pub struct Aggregator {
    session: Session,
    /// Command line given to new processes
    command_line: Option<Arc<str>>,
}

impl Aggregator {
    #[must_use]
    pub fn new(started_at: Instant) -> Self {
        Self { session: Session::new(started_at), command_line: None }
    }

    /// Command line recorded for processes seen from now on.
    #[must_use]
    pub fn with_command_line(mut self, command_line: Option<String>) -> Self {
        self.command_line = command_line.map(Arc::from);
        self
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fold a sample received at `now`.
    ///
    /// # Errors
    /// A malformed sample is counted, logged and returned; the session is
    /// otherwise untouched.
    pub fn ingest(&mut self, sample: &SampleRecord, now: Instant) -> Result<(), SampleError> {
        let metrics = match sample.validate() {
            Ok(m) => m,
            Err(e) => {
                self.reject(&e);
                return Err(e);
            }
        };

        let key = ThreadKey::new(sample.pid, sample.tid);
        let interpreter = self.session.metadata_value("python").map(Arc::from);
        let process = self.session.processes.entry(key.pid).or_insert_with(|| {
            debug!("New process {}", key.pid);
            ProcessState {
                pid: key.pid,
                command_line: self.command_line.clone(),
                interpreter,
                threads: HashMap::new(),
            }
        });
        let thread = process.threads.entry(key.tid).or_insert_with(|| {
            debug!("New thread {key}");
            self.session.thread_order.push(key);
            Arc::new(ThreadState::new(key, now))
        });

        let thread = Arc::make_mut(thread);
        Arc::make_mut(&mut thread.root).fold(sample.outer_to_inner(), metrics);
        thread.last_stack = sample.outer_to_inner().cloned().collect();
        thread.samples += 1;
        thread.last_update = now;
        thread.idle = sample.stack_ended;

        self.session.samples += 1;
        self.session.totals += metrics;
        self.session.last_sample_at = Some(now);
        Ok(())
    }

    /// Count a sample that could not be decoded or validated.
    pub fn reject(&mut self, err: &SampleError) {
        self.session.invalid += 1;
        if self.session.invalid % WARN_EVERY == 1 {
            warn!("Dropping malformed sample ({} so far): {err}", self.session.invalid);
        }
    }

    pub fn set_metadata(&mut self, key: String, value: String) {
        debug!("Sampler metadata {key}: {value}");
        self.session.metadata.push((key, value));
    }

    /// Record that the source closed at `now`. Idempotent.
    pub fn mark_stopped(&mut self, now: Instant) {
        if self.session.stopped_at.is_none() {
            self.session.stopped_at = Some(now);
        }
    }

    /// Immutable copy of the current state for publication.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Session> {
        Arc::new(self.session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacktop_common::MetricDeltas;

    fn frame(name: &str, line: u32) -> Frame {
        Frame::new(name, "app.py", line)
    }

    /// Build a record from an outermost-first stack.
    fn sample(tid: u64, outer_first: &[Frame], wall: i64) -> SampleRecord {
        SampleRecord {
            pid: 1,
            tid,
            stack: outer_first.iter().rev().cloned().collect(),
            deltas: Some(MetricDeltas { wall_us: wall, cpu_us: wall, memory_bytes: 0 }),
            stack_ended: false,
        }
    }

    #[test]
    fn test_ingest_three_samples_scenario() {
        let now = Instant::now();
        let (main, foo) = (frame("main", 1), frame("foo", 5));
        let mut agg = Aggregator::new(now);

        agg.ingest(&sample(1, &[main.clone()], 10), now).unwrap();
        agg.ingest(&sample(1, &[main.clone(), foo.clone()], 10), now).unwrap();
        agg.ingest(&sample(1, &[main.clone(), foo.clone()], 10), now).unwrap();

        let thread = agg.session().thread(ThreadKey::new(1, 1)).unwrap();
        assert_eq!(thread.root.total.wall_us, 30);
        let main_node = thread.root.child(&main).unwrap();
        assert_eq!((main_node.total.wall_us, main_node.own.wall_us), (30, 10));
        let foo_node = main_node.child(&foo).unwrap();
        assert_eq!((foo_node.total.wall_us, foo_node.own.wall_us), (20, 20));
        assert_eq!(&*thread.last_stack, &[main, foo]);
        assert_eq!(thread.samples, 3);
    }

    #[test]
    fn test_stale_after_grace_without_samples() {
        let start = Instant::now();
        let grace = Duration::from_secs(5);
        let mut agg = Aggregator::new(start);

        // before the first sample the clock runs from the session start
        assert!(!agg.session().is_stale(grace, start + Duration::from_secs(4)));
        assert!(agg.session().is_stale(grace, start + grace));

        let arrival = start + Duration::from_secs(6);
        agg.ingest(&sample(1, &[frame("main", 1)], 10), arrival).unwrap();
        assert!(!agg.session().is_stale(grace, arrival));
        assert!(!agg.session().is_stale(grace, arrival + Duration::from_secs(4)));
        assert!(agg.session().is_stale(grace, arrival + grace));
    }

    #[test]
    fn test_negative_delta_is_dropped_and_counted() {
        let now = Instant::now();
        let mut agg = Aggregator::new(now);
        let err = agg.ingest(&sample(1, &[frame("main", 1)], -5), now).unwrap_err();

        assert!(matches!(err, SampleError::NegativeMetric { .. }));
        assert_eq!(agg.session().invalid, 1);
        assert_eq!(agg.session().samples, 0);
        assert!(agg.session().thread_order().is_empty());
    }

    #[test]
    fn test_thread_order_is_first_seen() {
        let now = Instant::now();
        let mut agg = Aggregator::new(now);
        for tid in [9, 3, 9, 5] {
            agg.ingest(&sample(tid, &[frame("main", 1)], 1), now).unwrap();
        }
        let order: Vec<u64> = agg.session().thread_order().iter().map(|k| k.tid.0).collect();
        assert_eq!(order, vec![9, 3, 5]);
    }

    #[test]
    fn test_idle_thread_keeps_its_tree() {
        let now = Instant::now();
        let mut agg = Aggregator::new(now);
        agg.ingest(&sample(1, &[frame("main", 1)], 4), now).unwrap();
        let mut idle = sample(1, &[frame("main", 1)], 2);
        idle.stack_ended = true;
        agg.ingest(&idle, now).unwrap();

        let thread = agg.session().thread(ThreadKey::new(1, 1)).unwrap();
        assert!(thread.idle);
        assert_eq!(thread.root.total.wall_us, 6);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_samples() {
        let now = Instant::now();
        let mut agg = Aggregator::new(now);
        agg.ingest(&sample(1, &[frame("main", 1)], 1), now).unwrap();
        let published = agg.snapshot();
        agg.ingest(&sample(1, &[frame("main", 1)], 1), now).unwrap();
        agg.ingest(&sample(2, &[frame("main", 1)], 1), now).unwrap();

        assert_eq!(published.samples, 1);
        assert_eq!(published.thread_order().len(), 1);
        assert_eq!(published.thread(ThreadKey::new(1, 1)).unwrap().root.total.wall_us, 1);
        assert_eq!(agg.session().samples, 3);
    }

    #[test]
    fn test_process_metadata_set_on_first_sample() {
        let now = Instant::now();
        let mut agg = Aggregator::new(now).with_command_line(Some("python app.py".into()));
        agg.set_metadata("python".into(), "3.11.4".into());
        agg.ingest(&sample(1, &[], 1), now).unwrap();
        agg.set_metadata("python".into(), "3.12.0".into());
        agg.ingest(&sample(2, &[], 1), now).unwrap();

        let process = agg.session().process(Pid(1)).unwrap();
        assert_eq!(process.command_line.as_deref(), Some("python app.py"));
        assert_eq!(process.interpreter.as_deref(), Some("3.11.4"));
        assert_eq!(process.threads().len(), 2);
    }

    #[test]
    fn test_error_rate_and_stop() {
        let now = Instant::now();
        let mut agg = Aggregator::new(now);
        agg.ingest(&sample(1, &[], 1), now).unwrap();
        agg.reject(&SampleError::MissingPid("x".into()));
        assert!((agg.session().error_rate() - 50.0).abs() < f64::EPSILON);

        agg.mark_stopped(now);
        let elapsed = agg.session().elapsed();
        assert_eq!(agg.session().elapsed(), elapsed);
        assert!(agg.session().is_stopped());
    }
}
