//! Sample intake
//!
//! Everything between the external sampler and the published session:
//! - [`source`]: the line stream (sampler command, file or stdin)
//! - [`ingest`]: the ingestion loop and lock-free snapshot publication
//! - [`system`]: best-effort probe of the profiled process (memory, cores)

pub mod ingest;
pub mod source;
pub mod system;

pub use ingest::{ExitReason, IngestionLoop, SharedState, UiRequest, PUBLISH_BATCH, PUBLISH_SLICE};
pub use source::SampleSource;
pub use system::SystemProbe;
