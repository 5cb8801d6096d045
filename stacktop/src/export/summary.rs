//! Plain-text summary printed when running headless.

use std::io::{self, Write};

use crate::aggregation::Session;
use crate::analysis::snapshot::table_rows;
use crate::domain::{fmt_time, ProfileMode};

/// Rows shown per thread.
pub const SUMMARY_TOP: usize = 10;

/// Write the heaviest `top` call paths of every thread, in thread order.
///
/// # Errors
/// Returns the underlying I/O error if the write fails.
pub fn write_summary<W: Write>(
    session: &Session,
    mode: ProfileMode,
    threshold: f64,
    top: usize,
    out: &mut W,
) -> io::Result<()> {
    writeln!(
        out,
        "{} samples ({} invalid, {:.1}%) in {}, {} threads",
        session.samples,
        session.invalid,
        session.error_rate(),
        fmt_time(u64::try_from(session.elapsed().as_micros()).unwrap_or(u64::MAX)),
        session.thread_order().len(),
    )?;

    for key in session.thread_order() {
        let Some(thread) = session.thread(*key) else { continue };
        writeln!(out)?;
        writeln!(out, "Thread {key} ({} samples)", thread.samples)?;
        writeln!(out, "  {:>8}  {:>8}  {:>6}  {:>6}  FUNCTION", "OWN", "TOTAL", "%OWN", "%TOTAL")?;
        for row in table_rows(thread, mode, threshold).iter().take(top) {
            writeln!(
                out,
                "  {:>8}  {:>8}  {:>6.1}  {:>6.1}  {} ({}:{})",
                mode.format(row.own),
                mode.format(row.total),
                row.own_pct,
                row.total_pct,
                row.frame.function,
                row.frame.file,
                row.frame.line,
            )?;
        }
    }
    Ok(())
}
