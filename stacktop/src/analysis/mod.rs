//! Analysis logic for aggregated samples
//!
//! Pure functions and small trackers that turn published session state into
//! what the TUI draws, separated from the presentation layer.
//!
//! - [`metrics`]: CPU% and memory time series, fed once per tick
//! - [`snapshot`]: statistics table and full call tree rows
//! - [`flame`]: flame graph rectangles

pub mod flame;
pub mod metrics;
pub mod snapshot;

pub use flame::{height, layout, FlameRect};
pub use metrics::{History, MetricsTracker};
pub use snapshot::{snapshot, DisplayModel, StatRow, ViewKind};
