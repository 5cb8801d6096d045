//! # Aggregation Engine
//!
//! Turns the unbounded sample stream into bounded per-thread state: one call
//! tree per `(pid, tid)` plus the thread's most recent stack.
//!
//! ```text
//! SampleRecord ──▶ Aggregator::ingest ──▶ Session
//!                   O(stack depth)         ├─ ProcessState (pid)
//!                                          │   └─ ThreadState (tid)
//!                                          │       ├─ CallTreeNode root
//!                                          │       └─ last_stack
//!                                          └─ counters, metadata
//! ```
//!
//! Samples are summed in arrival order. Overlapping or duplicated samples are
//! not reconciled; totals only ever grow.

pub mod call_tree;
pub mod session;

pub use call_tree::CallTreeNode;
pub use session::{Aggregator, ProcessState, Session, ThreadState};
