//! Session export functionality
//!
//! Writes the whole aggregated session to a file on demand. Two formats are
//! supported: collapsed stacks (readable by the sample decoder and by common
//! flame graph tools) and a JSON dump of every call tree. Headless runs end
//! with a plain-text summary instead.

pub mod snapshot_file;
pub mod summary;

pub use snapshot_file::{save_snapshot, snapshot_filename, write_collapsed, write_json};
pub use summary::{write_summary, SUMMARY_TOP};
