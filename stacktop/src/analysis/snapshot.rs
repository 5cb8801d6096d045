//! Render-ready views of one thread's call tree.
//!
//! Everything here is a pure read of a published [`ThreadState`]; building the
//! same view twice from the same state yields identical output.
//!
//! ```text
//!  OWN    TOTAL   %OWN   %TOTAL  FUNCTION
//!  00"    01'12"   0.0   100.0   <module> (app.py:1)
//!  03"    01'09"   4.1    95.8   ├─ main (app.py:40)
//!  01'06" 01'06"  91.7    91.7   │  └─ work (app.py:12)
//! ```

// Percentages are ratios of u64 counters
#![allow(clippy::cast_precision_loss)]

use stacktop_common::Frame;

use crate::aggregation::{CallTreeNode, ThreadState};
use crate::domain::ProfileMode;

use super::flame::{height, layout, FlameRect};

/// Which view of the selected thread to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    /// The frames of the thread's most recent stack, outermost first
    #[default]
    LastStack,
    /// Every node as a flat row, heaviest first
    Table,
    /// The whole tree in pre-order with indentation
    FullTree,
    /// Flame graph rectangles for the given width
    Flame { width: usize },
}

/// One row of the statistics table.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRow {
    pub frame: Frame,
    /// Distance from the thread root (top-level frames are 1)
    pub depth: usize,
    /// Tree glyphs drawn before the name (full-tree view only)
    pub prefix: String,
    pub own: u64,
    pub total: u64,
    pub own_pct: f64,
    pub total_pct: f64,
    pub own_samples: u64,
    pub total_samples: u64,
    /// The node lies on the thread's most recent stack
    pub on_last_stack: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayModel {
    LastStack(Vec<StatRow>),
    Table(Vec<StatRow>),
    FullTree(Vec<StatRow>),
    Flame(Vec<FlameRect>),
}

impl DisplayModel {
    /// Number of scrollable lines: rows, or flame graph levels.
    #[must_use]
    pub fn row_count(&self) -> usize {
        match self {
            DisplayModel::LastStack(rows)
            | DisplayModel::Table(rows)
            | DisplayModel::FullTree(rows) => rows.len(),
            DisplayModel::Flame(rects) => height(rects),
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[StatRow] {
        match self {
            DisplayModel::LastStack(rows)
            | DisplayModel::Table(rows)
            | DisplayModel::FullTree(rows) => rows,
            DisplayModel::Flame(_) => &[],
        }
    }
}

/// Build the requested view of `thread`.
///
/// Percentages are relative to the thread's own root total in `mode`, and
/// `threshold` is the minimum `%TOTAL` (0 to 100) a row needs to be shown.
#[must_use]
pub fn snapshot(
    thread: &ThreadState,
    mode: ProfileMode,
    threshold: f64,
    view: ViewKind,
) -> DisplayModel {
    match view {
        ViewKind::LastStack => DisplayModel::LastStack(last_stack_rows(thread, mode, threshold)),
        ViewKind::Table => DisplayModel::Table(table_rows(thread, mode, threshold)),
        ViewKind::FullTree => DisplayModel::FullTree(tree_rows(thread, mode, threshold)),
        ViewKind::Flame { width } => DisplayModel::Flame(layout(&thread.root, mode, width)),
    }
}

/// `value` as a percentage of `whole`; zero when there is nothing to compare to.
#[must_use]
pub fn percent(value: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        value as f64 * 100.0 / whole as f64
    }
}

fn make_row(
    node: &CallTreeNode,
    frame: &Frame,
    depth: usize,
    prefix: String,
    on_last_stack: bool,
    mode: ProfileMode,
    whole: u64,
) -> StatRow {
    let own = mode.value(&node.own);
    let total = mode.value(&node.total);
    StatRow {
        frame: frame.clone(),
        depth,
        prefix,
        own,
        total,
        own_pct: percent(own, whole),
        total_pct: percent(total, whole),
        own_samples: node.own.samples,
        total_samples: node.total.samples,
        on_last_stack,
    }
}

/// Whether the child at `depth` continues the thread's last stack.
fn continues_last_stack(thread: &ThreadState, parent_on: bool, depth: usize, frame: &Frame) -> bool {
    parent_on && thread.last_stack.get(depth - 1) == Some(frame)
}

/// The thread's most recent stack from the entry point down. Stops at the
/// first frame below `threshold`; everything under it is smaller still.
#[must_use]
pub fn last_stack_rows(thread: &ThreadState, mode: ProfileMode, threshold: f64) -> Vec<StatRow> {
    let whole = mode.value(&thread.root.total);
    let mut rows = Vec::with_capacity(thread.last_stack.len());
    let mut node = thread.root.as_ref();
    for (depth, frame) in thread.last_stack.iter().enumerate() {
        let Some(child) = node.child(frame) else { break };
        let row = make_row(child, frame, depth + 1, String::new(), true, mode, whole);
        if row.total_pct < threshold {
            break;
        }
        rows.push(row);
        node = child;
    }
    rows
}

/// Flat table: one row per node at or above `threshold`, sorted by
/// `%TOTAL` descending, then function name, then depth, then tree order.
#[must_use]
pub fn table_rows(thread: &ThreadState, mode: ProfileMode, threshold: f64) -> Vec<StatRow> {
    let whole = mode.value(&thread.root.total);
    let mut rows: Vec<(usize, StatRow)> = Vec::new();

    // (node, depth, on last stack); children pushed reversed to keep pre-order
    let mut stack: Vec<(&CallTreeNode, usize, bool)> = vec![(thread.root.as_ref(), 0, true)];
    let mut preorder = 0;
    while let Some((node, depth, on_last)) = stack.pop() {
        if let Some(frame) = node.frame() {
            let row = make_row(node, frame, depth, String::new(), on_last, mode, whole);
            if row.total_pct >= threshold {
                rows.push((preorder, row));
            }
            preorder += 1;
        }
        for child in node.children().rev() {
            let Some(frame) = child.frame() else { continue };
            let on = continues_last_stack(thread, on_last, depth + 1, frame);
            stack.push((child, depth + 1, on));
        }
    }

    rows.sort_by(|(ia, a), (ib, b)| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.frame.function.cmp(&b.frame.function))
            .then_with(|| a.depth.cmp(&b.depth))
            .then_with(|| ia.cmp(ib))
    });
    rows.into_iter().map(|(_, row)| row).collect()
}

/// Full tree in pre-order, children in first-seen order. A node below
/// `threshold` hides its whole subtree.
#[must_use]
pub fn tree_rows(thread: &ThreadState, mode: ProfileMode, threshold: f64) -> Vec<StatRow> {
    let whole = mode.value(&thread.root.total);
    let visible = |node: &CallTreeNode| percent(mode.value(&node.total), whole) >= threshold;

    let mut rows = Vec::new();
    // (node, depth, glyphs for this row, glyphs inherited by its children, on last stack)
    let mut stack: Vec<(&CallTreeNode, usize, String, String, bool)> = Vec::new();
    push_children(&mut stack, thread, thread.root.as_ref(), 0, "", true, &visible);

    while let Some((node, depth, marker, indent, on_last)) = stack.pop() {
        let Some(frame) = node.frame() else { continue };
        rows.push(make_row(node, frame, depth, marker, on_last, mode, whole));
        push_children(&mut stack, thread, node, depth, &indent, on_last, &visible);
    }
    rows
}

fn push_children<'a>(
    stack: &mut Vec<(&'a CallTreeNode, usize, String, String, bool)>,
    thread: &ThreadState,
    parent: &'a CallTreeNode,
    depth: usize,
    indent: &str,
    parent_on: bool,
    visible: &impl Fn(&CallTreeNode) -> bool,
) {
    let shown: Vec<&CallTreeNode> = parent.children().filter(|&c| visible(c)).collect();
    let last = shown.len().saturating_sub(1);
    for (i, child) in shown.into_iter().enumerate().rev() {
        let Some(frame) = child.frame() else { continue };
        let (marker, cont) = if i == last { ("└─ ", "   ") } else { ("├─ ", "│  ") };
        let on = continues_last_stack(thread, parent_on, depth + 1, frame);
        stack.push((child, depth + 1, format!("{indent}{marker}"), format!("{indent}{cont}"), on));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Aggregator;
    use crate::domain::ThreadKey;
    use stacktop_common::{MetricDeltas, SampleRecord};
    use std::time::Instant;

    fn f(name: &str) -> Frame {
        Frame::new(name, "app.py", 1)
    }

    /// Stacks are space-separated function names, outermost first.
    fn thread(samples: &[(&str, i64)]) -> ThreadState {
        let now = Instant::now();
        let mut agg = Aggregator::new(now);
        for (stack, wall) in samples {
            let record = SampleRecord {
                pid: 1,
                tid: 1,
                stack: stack.split_whitespace().rev().map(f).collect(),
                deltas: Some(MetricDeltas { wall_us: *wall, cpu_us: *wall, memory_bytes: 0 }),
                stack_ended: false,
            };
            agg.ingest(&record, now).unwrap();
        }
        agg.session().thread(ThreadKey::new(1, 1)).unwrap().clone()
    }

    fn names(rows: &[StatRow]) -> Vec<String> {
        rows.iter().map(|r| format!("{}{}", r.prefix, r.frame.function)).collect()
    }

    #[test]
    fn test_table_sorted_by_total_then_name() {
        let t = thread(&[("main b", 10), ("main a", 10), ("main", 5)]);
        let rows = table_rows(&t, ProfileMode::Wall, 0.0);
        assert_eq!(names(&rows), vec!["main", "a", "b"]);
        assert!((rows[0].total_pct - 100.0).abs() < 1e-9);
        assert!((rows[0].own_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_table_flags_last_stack() {
        let t = thread(&[("main a", 10), ("main b", 10)]);
        let rows = table_rows(&t, ProfileMode::Wall, 0.0);
        let flagged: Vec<&str> =
            rows.iter().filter(|r| r.on_last_stack).map(|r| &*r.frame.function).collect();
        assert_eq!(flagged, vec!["main", "b"]);
    }

    #[test]
    fn test_threshold_filters_rows() {
        let t = thread(&[("main hot", 90), ("main cold", 10)]);
        assert_eq!(table_rows(&t, ProfileMode::Wall, 0.0).len(), 3);
        assert_eq!(names(&table_rows(&t, ProfileMode::Wall, 50.0)), vec!["main", "hot"]);
        assert!(table_rows(&t, ProfileMode::Wall, 100.5).is_empty());
    }

    #[test]
    fn test_full_tree_glyphs_and_pruning() {
        let t = thread(&[("main a x", 40), ("main b", 50), ("main c", 10)]);
        let rows = tree_rows(&t, ProfileMode::Wall, 0.0);
        assert_eq!(names(&rows), vec!["└─ main", "   ├─ a", "   │  └─ x", "   ├─ b", "   └─ c"]);

        let pruned = tree_rows(&t, ProfileMode::Wall, 20.0);
        assert_eq!(names(&pruned), vec!["└─ main", "   ├─ a", "   │  └─ x", "   └─ b"]);
    }

    #[test]
    fn test_last_stack_follows_latest_sample() {
        let t = thread(&[("main hot x", 60), ("main cold y", 30), ("main cold", 10)]);
        let rows = last_stack_rows(&t, ProfileMode::Wall, 0.0);
        assert_eq!(names(&rows), vec!["main", "cold"]);
        assert_eq!(rows.iter().map(|r| r.depth).collect::<Vec<_>>(), vec![1, 2]);
        assert!(rows.iter().all(|r| r.on_last_stack));
        assert!((rows[1].total_pct - 40.0).abs() < 1e-9);
        assert!((rows[1].own_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_stack_stops_at_threshold() {
        let t = thread(&[("main hot", 80), ("main cold leaf", 20)]);
        assert_eq!(names(&last_stack_rows(&t, ProfileMode::Wall, 0.0)), vec!["main", "cold", "leaf"]);
        assert_eq!(names(&last_stack_rows(&t, ProfileMode::Wall, 50.0)), vec!["main"]);
        assert!(last_stack_rows(&t, ProfileMode::Wall, 100.5).is_empty());

        let model = snapshot(&t, ProfileMode::Wall, 50.0, ViewKind::default());
        assert_eq!(model.row_count(), 1);
        assert!(matches!(model, DisplayModel::LastStack(_)));
    }

    #[test]
    fn test_root_only_thread_has_no_rows() {
        let t = thread(&[("", 10)]);
        assert_eq!(t.root.own.wall_us, 10);
        assert!(table_rows(&t, ProfileMode::Wall, 0.0).is_empty());
        assert!(tree_rows(&t, ProfileMode::Wall, 0.0).is_empty());
        assert!(last_stack_rows(&t, ProfileMode::Wall, 0.0).is_empty());
    }
}
