//! Ingestion loop and snapshot publication.
//!
//! The loop owns the [`Aggregator`] outright. Readers never touch it; they
//! load the latest immutable [`Session`] from [`SharedState`] instead:
//!
//! ```text
//!  SampleSource ──lines──▶ IngestionLoop ──publish──▶ ArcSwap<Session>
//!                              ▲                          │ load
//!                              │ UiRequest::Quit          ▼
//!                              └──────────────────── render thread
//! ```
//!
//! A new snapshot is published every [`PUBLISH_SLICE`] or after
//! [`PUBLISH_BATCH`] samples, whichever comes first, and only when something
//! changed. Publication is an `Arc` swap, so a slow render never stalls
//! ingestion and never observes a half-applied sample.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, info, warn};
use stacktop_common::{parse_line, SampleError, SingleMetric, SourceLine};
use tokio::time::MissedTickBehavior;

use super::source::SampleSource;
use crate::aggregation::{Aggregator, Session};
use crate::domain::ProfileMode;

/// Longest time a change waits before it becomes visible to readers.
pub const PUBLISH_SLICE: Duration = Duration::from_millis(100);

/// Samples folded before an early publish.
pub const PUBLISH_BATCH: usize = 512;

/// Requests from the render thread to the ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiRequest {
    Quit,
}

/// State shared between the ingestion loop and its readers.
pub struct SharedState {
    snapshot: ArcSwap<Session>,
    shutdown: AtomicBool,
}

impl SharedState {
    #[must_use]
    pub fn new(initial: Arc<Session>) -> Self {
        Self { snapshot: ArcSwap::new(initial), shutdown: AtomicBool::new(false) }
    }

    /// Latest published session. Never blocks.
    #[must_use]
    pub fn load(&self) -> Arc<Session> {
        self.snapshot.load_full()
    }

    fn publish(&self, session: Arc<Session>) {
        self.snapshot.store(session);
    }

    /// Ask readers to wind down (ingestion has finished).
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

/// Why [`IngestionLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The render thread asked to quit (or went away)
    Quit,
    /// Ctrl-C or SIGTERM
    Interrupted,
    /// The source ended and nothing was waiting for a quit request
    SourceClosed,
}

impl ExitReason {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            ExitReason::Quit => "quit",
            ExitReason::Interrupted => "interrupted",
            ExitReason::SourceClosed => "source closed",
        }
    }
}

pub struct IngestionLoop {
    aggregator: Aggregator,
    single: SingleMetric,
    shared: Arc<SharedState>,
    /// Samples folded since the last publish
    pending: usize,
    dirty: bool,
    last_publish: Instant,
}

impl IngestionLoop {
    #[must_use]
    pub fn new(aggregator: Aggregator, mode: ProfileMode, shared: Arc<SharedState>) -> Self {
        Self {
            aggregator,
            single: mode.single_metric(),
            shared,
            pending: 0,
            dirty: false,
            last_publish: Instant::now(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        self.aggregator.session()
    }

    /// Fold in one line exactly as read from the source. A line that is not
    /// UTF-8 is counted as malformed like any other.
    pub fn handle_bytes(&mut self, raw: &[u8], now: Instant) {
        match std::str::from_utf8(raw) {
            Ok(line) => self.handle_line(line, now),
            Err(e) => {
                self.aggregator.reject(&SampleError::NotUtf8 { valid_up_to: e.valid_up_to() });
                self.dirty = true;
            }
        }
    }

    /// Decode one raw line and fold it in. Malformed lines are counted and
    /// dropped.
    pub fn handle_line(&mut self, raw: &str, now: Instant) {
        match parse_line(raw, self.single) {
            Ok(SourceLine::Sample(sample)) => {
                if self.aggregator.ingest(&sample, now).is_ok() {
                    self.pending += 1;
                }
            }
            Ok(SourceLine::Metadata { key, value }) => self.aggregator.set_metadata(key, value),
            Ok(SourceLine::Blank) => return,
            Err(e) => self.aggregator.reject(&e),
        }
        // rejected samples move the error rate
        self.dirty = true;
        if self.pending >= PUBLISH_BATCH {
            self.publish(now);
        }
    }

    /// Publish if there are unpublished changes and the time slice is up.
    pub fn maybe_publish(&mut self, now: Instant) {
        if self.dirty && now.saturating_duration_since(self.last_publish) >= PUBLISH_SLICE {
            self.publish(now);
        }
    }

    pub fn publish(&mut self, now: Instant) {
        self.shared.publish(self.aggregator.snapshot());
        self.pending = 0;
        self.dirty = false;
        self.last_publish = now;
    }

    /// Mark the source as ended and publish the final state.
    pub fn finish(&mut self, now: Instant) {
        if !self.aggregator.session().is_stopped() {
            self.aggregator.mark_stopped(now);
            self.publish(now);
        }
    }

    /// Consume `source` until it ends, a quit request arrives, or the process
    /// is interrupted.
    ///
    /// With `exit_on_close` the loop returns as soon as the source ends;
    /// otherwise it keeps serving the final snapshot until asked to quit.
    /// The sampler is stopped and readers are told to shut down before
    /// returning.
    pub async fn run(
        &mut self,
        mut source: SampleSource,
        quit: Option<Receiver<UiRequest>>,
        exit_on_close: bool,
    ) -> ExitReason {
        let mut tick = tokio::time::interval(PUBLISH_SLICE);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let interrupted = shutdown_signal();
        tokio::pin!(interrupted);

        let mut open = true;
        let reason = loop {
            tokio::select! {
                line = source.next_line(), if open => match line {
                    Ok(Some(line)) => self.handle_bytes(&line, Instant::now()),
                    Ok(None) => {
                        info!("Sample source {} closed", source.description());
                        open = false;
                        self.finish(Instant::now());
                        if exit_on_close {
                            break ExitReason::SourceClosed;
                        }
                    }
                    Err(e) => {
                        warn!("Reading samples failed: {e}");
                        open = false;
                        self.finish(Instant::now());
                        if exit_on_close {
                            break ExitReason::SourceClosed;
                        }
                    }
                },
                _ = tick.tick() => {
                    self.maybe_publish(Instant::now());
                    if let Some(rx) = &quit {
                        match rx.try_recv() {
                            Ok(UiRequest::Quit) | Err(TryRecvError::Disconnected) => break ExitReason::Quit,
                            Err(TryRecvError::Empty) => {}
                        }
                    }
                }
                () = &mut interrupted => break ExitReason::Interrupted,
            }
        };

        debug!("Ingestion loop exiting: {}", reason.describe());
        source.shutdown().await;
        self.finish(Instant::now());
        self.shared.request_shutdown();
        reason
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingestion() -> (IngestionLoop, Arc<SharedState>) {
        let now = Instant::now();
        let aggregator = Aggregator::new(now);
        let shared = Arc::new(SharedState::new(aggregator.snapshot()));
        (IngestionLoop::new(aggregator, ProfileMode::Wall, Arc::clone(&shared)), shared)
    }

    #[test]
    fn test_publish_is_batched() {
        let (mut ingest, shared) = ingestion();
        let now = Instant::now();
        for _ in 0..PUBLISH_BATCH - 1 {
            ingest.handle_line("P1;T1;app.py:main:1 10", now);
        }
        assert_eq!(shared.load().samples, 0);

        ingest.handle_line("P1;T1;app.py:main:1 10", now);
        assert_eq!(shared.load().samples, PUBLISH_BATCH as u64);
    }

    #[test]
    fn test_time_slice_publishes_changes() {
        let (mut ingest, shared) = ingestion();
        let now = Instant::now();
        ingest.handle_line("P1;T1;app.py:main:1 10", now);
        ingest.handle_line("garbage", now);

        ingest.maybe_publish(now + PUBLISH_SLICE);
        let session = shared.load();
        assert_eq!((session.samples, session.invalid), (1, 1));
    }

    #[test]
    fn test_metadata_and_blank_lines() {
        let (mut ingest, _) = ingestion();
        let now = Instant::now();
        ingest.handle_line("# python: 3.12.1", now);
        ingest.handle_line("", now);
        assert_eq!(ingest.session().metadata_value("python"), Some("3.12.1"));
        assert_eq!(ingest.session().invalid, 0);
    }

    #[tokio::test]
    async fn test_run_until_source_closes() {
        let (mut ingest, shared) = ingestion();
        let source = SampleSource::from_reader(
            &b"# mode: wall\nP1;T1;app.py:main:1 10\nP1;T2;app.py:main:1 5\nnonsense\n"[..],
            "test",
        );

        let reason = ingest.run(source, None, true).await;

        assert_eq!(reason, ExitReason::SourceClosed);
        let session = shared.load();
        assert!(session.is_stopped());
        assert_eq!((session.samples, session.invalid), (2, 1));
        assert_eq!(session.thread_order().len(), 2);
        assert!(shared.is_shutdown());
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_dropped_and_reading_continues() {
        let (mut ingest, shared) = ingestion();
        let source = SampleSource::from_reader(
            &b"P1;T1;app.py:main:1 10\nP1;T1;caf\xe9.py:main:1 10\nP1;T1;app.py:main:1 10\nP1;T2;app.py:main:1 10\n"[..],
            "test",
        );

        let reason = ingest.run(source, None, true).await;

        assert_eq!(reason, ExitReason::SourceClosed);
        let session = shared.load();
        assert_eq!((session.samples, session.invalid), (3, 1));
        assert_eq!(session.thread_order().len(), 2);
    }

    #[tokio::test]
    async fn test_quit_request_stops_open_source() {
        let (mut ingest, shared) = ingestion();
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(UiRequest::Quit).unwrap();
        let (_keep_open, reader) = tokio::io::duplex(64);
        let source = SampleSource::from_reader(reader, "pipe");

        let reason = ingest.run(source, Some(rx), false).await;

        assert_eq!(reason, ExitReason::Quit);
        assert!(shared.is_shutdown());
    }
}
