use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};
use stacktop_common::{Frame, Metrics};

use crate::aggregation::{CallTreeNode, ProcessState, Session, ThreadState};
use crate::cli::SaveFormat;
use crate::domain::{ProfileMode, SaveError};

/// File name for a snapshot taken at `unix_secs` of process `pid`.
#[must_use]
pub fn snapshot_filename(unix_secs: u64, pid: u32, format: SaveFormat) -> String {
    let ext = match format {
        SaveFormat::Collapsed => "txt",
        SaveFormat::Json => "json",
    };
    format!("stacktop_{unix_secs}_{pid}.{ext}")
}

/// Write `session` into `dir` and return the path written.
///
/// # Errors
/// Returns a [`SaveError`] when the file cannot be created or written.
pub fn save_snapshot(
    session: &Session,
    mode: ProfileMode,
    format: SaveFormat,
    dir: &Path,
    unix_secs: u64,
    pid: u32,
) -> Result<PathBuf, SaveError> {
    let path = dir.join(snapshot_filename(unix_secs, pid, format));
    let file =
        File::create(&path).map_err(|source| SaveError::Create { path: path.clone(), source })?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Collapsed => {
            let rows = write_collapsed(session, mode, &mut writer)?;
            info!("Saved {rows} call paths to {}", path.display());
        }
        SaveFormat::Json => {
            write_json(session, mode, &mut writer)?;
            info!("Saved session tree to {}", path.display());
        }
    }
    writer.flush()?;
    Ok(path)
}

// =============================================================================
// COLLAPSED STACKS
// =============================================================================

fn write_frames<W: Write>(writer: &mut W, frames: &[&Frame]) -> std::io::Result<()> {
    for frame in frames {
        write!(writer, ";{}:{}:{}", frame.file, frame.function, frame.line)?;
    }
    Ok(())
}

/// Write a `# key: value` header, a blank line, then one
/// `P<pid>;T<tid>;<frames> <own>` row per call path that was ever a leaf.
///
/// Returns the number of data rows written.
///
/// # Errors
/// Returns [`SaveError::Write`] on I/O failure.
pub fn write_collapsed<W: Write>(
    session: &Session,
    mode: ProfileMode,
    writer: &mut W,
) -> Result<usize, SaveError> {
    writeln!(writer, "# stacktop: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(writer, "# mode: {}", mode.label().to_lowercase())?;
    for (key, value) in session.metadata() {
        writeln!(writer, "# {key}: {value}")?;
    }
    writeln!(writer)?;

    let mut rows = 0;
    for key in session.thread_order() {
        let Some(thread) = session.thread(*key) else { continue };

        // (node, path from the root down to node)
        let mut work: Vec<(&CallTreeNode, Vec<&Frame>)> = vec![(thread.root.as_ref(), Vec::new())];
        while let Some((node, path)) = work.pop() {
            if !node.own.is_zero() {
                // decimal tid: the hex display form would read back as a different id
                write!(writer, "P{};T{}", key.pid, key.tid.0)?;
                write_frames(writer, &path)?;
                writeln!(writer, " {}", mode.value(&node.own))?;
                rows += 1;
            }
            for child in node.children().rev() {
                let Some(frame) = child.frame() else { continue };
                let mut child_path = path.clone();
                child_path.push(frame);
                work.push((child, child_path));
            }
        }
    }
    Ok(rows)
}

// =============================================================================
// JSON
// =============================================================================

#[derive(Serialize)]
struct SavedMetrics {
    samples: u64,
    wall_us: u64,
    cpu_us: u64,
    memory_bytes: u64,
}

impl From<Metrics> for SavedMetrics {
    fn from(m: Metrics) -> Self {
        Self { samples: m.samples, wall_us: m.wall_us, cpu_us: m.cpu_us, memory_bytes: m.memory_bytes }
    }
}

/// Serializes a call tree node and its subtree without copying it.
struct NodeView<'a>(&'a CallTreeNode);

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.0;
        let mut s = serializer.serialize_struct("Node", 6)?;
        s.serialize_field("function", &node.frame().map(|f| &*f.function))?;
        s.serialize_field("file", &node.frame().map(|f| &*f.file))?;
        s.serialize_field("line", &node.frame().map(|f| f.line))?;
        s.serialize_field("own", &SavedMetrics::from(node.own))?;
        s.serialize_field("total", &SavedMetrics::from(node.total))?;
        s.serialize_field("children", &ChildrenView(node))?;
        s.end()
    }
}

struct ChildrenView<'a>(&'a CallTreeNode);

impl Serialize for ChildrenView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.children().len()))?;
        for child in self.0.children() {
            seq.serialize_element(&NodeView(child))?;
        }
        seq.end()
    }
}

#[derive(Serialize)]
struct SavedThread<'a> {
    tid: String,
    samples: u64,
    idle: bool,
    tree: NodeView<'a>,
}

impl<'a> From<&'a ThreadState> for SavedThread<'a> {
    fn from(t: &'a ThreadState) -> Self {
        Self { tid: t.key.tid.to_string(), samples: t.samples, idle: t.idle, tree: NodeView(&t.root) }
    }
}

#[derive(Serialize)]
struct SavedProcess<'a> {
    pid: u32,
    command_line: Option<&'a str>,
    interpreter: Option<&'a str>,
    threads: Vec<SavedThread<'a>>,
}

impl<'a> From<&'a ProcessState> for SavedProcess<'a> {
    fn from(p: &'a ProcessState) -> Self {
        Self {
            pid: p.pid.0,
            command_line: p.command_line.as_deref(),
            interpreter: p.interpreter.as_deref(),
            threads: p.threads().into_iter().map(SavedThread::from).collect(),
        }
    }
}

#[derive(Serialize)]
struct SavedSession<'a> {
    version: &'static str,
    mode: ProfileMode,
    samples: u64,
    invalid: u64,
    elapsed_us: u128,
    metadata: Vec<(&'a str, &'a str)>,
    processes: Vec<SavedProcess<'a>>,
}

/// Write every process, thread and call tree as one JSON document.
///
/// # Errors
/// Returns [`SaveError::Json`] when serialization or the write fails.
pub fn write_json<W: Write>(
    session: &Session,
    mode: ProfileMode,
    writer: &mut W,
) -> Result<(), SaveError> {
    let saved = SavedSession {
        version: env!("CARGO_PKG_VERSION"),
        mode,
        samples: session.samples,
        invalid: session.invalid,
        elapsed_us: session.elapsed().as_micros(),
        metadata: session.metadata().iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
        processes: session.processes().map(SavedProcess::from).collect(),
    };
    serde_json::to_writer_pretty(writer, &saved)?;
    Ok(())
}
