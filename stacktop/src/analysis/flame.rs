//! Flame graph layout.
//!
//! Converts a call tree into rectangles measured in terminal columns:
//!
//! ```text
//! depth 0  [ thread ............................................ ]
//! depth 1  [ main ...................................... ][ gc . ]
//! depth 2  [ parse ........ ][ render .............. ]
//! ```
//!
//! Children are placed left to right in first-seen order so the picture stays
//! put between refreshes. Widths use integer arithmetic: each child gets
//! `floor(W * child / parent)` columns and the last drawn child takes the
//! rounding residue, so siblings cover exactly `floor(W * children / parent)`
//! columns, which is the full parent width when the parent has no own time.
//! Zero-width nodes are not emitted, and neither are their descendants.

// Percentages are ratios of u64 counters
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use stacktop_common::Frame;

use crate::aggregation::CallTreeNode;
use crate::domain::ProfileMode;

use super::snapshot::percent;

/// One box of the flame graph.
#[derive(Debug, Clone, PartialEq)]
pub struct FlameRect {
    /// Row, counted from the thread root at 0
    pub depth: usize,
    /// First column
    pub x: usize,
    /// Width in columns, never zero
    pub width: usize,
    /// `None` for the thread root
    pub frame: Option<Frame>,
    /// Share of the thread total, in percent
    pub weight_pct: f64,
}

/// `floor(width * part / whole)` without overflow.
fn scale(width: usize, part: u64, whole: u64) -> usize {
    if whole == 0 {
        return 0;
    }
    (width as u128 * u128::from(part) / u128::from(whole)) as usize
}

/// Lay out `root` over `width` columns, pre-order.
///
/// An explicit work stack is used so very deep stacks cannot overflow the
/// call stack. Returns nothing when the tree has no weight in `mode`.
#[must_use]
pub fn layout(root: &CallTreeNode, mode: ProfileMode, width: usize) -> Vec<FlameRect> {
    let whole = mode.value(&root.total);
    let mut rects = Vec::new();
    if whole == 0 || width == 0 {
        return rects;
    }

    // (node, depth, x, width)
    let mut work: Vec<(&CallTreeNode, usize, usize, usize)> = vec![(root, 0, 0, width)];
    while let Some((node, depth, x, w)) = work.pop() {
        let total = mode.value(&node.total);
        rects.push(FlameRect {
            depth,
            x,
            width: w,
            frame: node.frame().cloned(),
            weight_pct: percent(total, whole),
        });

        let weights: Vec<u64> = node.children().map(|c| mode.value(&c.total)).collect();
        let covered = scale(w, weights.iter().sum(), total);
        let mut spans = Vec::with_capacity(weights.len());
        let mut cursor = x;
        let mut used = 0;
        for (i, &weight) in weights.iter().enumerate() {
            let span = if i + 1 == weights.len() {
                covered.saturating_sub(used)
            } else {
                scale(w, weight, total)
            };
            spans.push((cursor, span));
            cursor += span;
            used += span;
        }

        // reversed so the first child is popped first
        for (child, (cx, cw)) in node.children().zip(spans).rev() {
            if cw > 0 {
                work.push((child, depth + 1, cx, cw));
            }
        }
    }
    rects
}

/// Deepest row in a layout, plus one; zero when empty.
#[must_use]
pub fn height(rects: &[FlameRect]) -> usize {
    rects.iter().map(|r| r.depth + 1).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacktop_common::Metrics;

    fn wall(us: u64) -> Metrics {
        Metrics { samples: 1, wall_us: us, cpu_us: us, memory_bytes: 0 }
    }

    fn frame(name: &str) -> Frame {
        Frame::new(name, "app.py", 1)
    }

    #[test]
    fn test_seventy_thirty_split() {
        let mut root = CallTreeNode::root();
        root.fold([&frame("a")], wall(70));
        root.fold([&frame("b")], wall(30));

        let rects = layout(&root, ProfileMode::Wall, 10);
        assert_eq!(rects.len(), 3);
        assert_eq!((rects[0].x, rects[0].width), (0, 10));
        assert_eq!((rects[1].x, rects[1].width), (0, 7));
        assert_eq!((rects[2].x, rects[2].width), (7, 3));
        assert!((rects[1].weight_pct - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_residue_goes_to_last_child() {
        let mut root = CallTreeNode::root();
        for name in ["a", "b", "c"] {
            root.fold([&frame(name)], wall(1));
        }
        let rects = layout(&root, ProfileMode::Wall, 10);
        let widths: Vec<usize> = rects[1..].iter().map(|r| r.width).collect();
        assert_eq!(widths, vec![3, 3, 4]);
    }

    #[test]
    fn test_narrow_nodes_dropped_with_subtree() {
        let mut root = CallTreeNode::root();
        root.fold([&frame("big")], wall(99));
        root.fold([&frame("tiny"), &frame("deeper")], wall(1));

        let rects = layout(&root, ProfileMode::Wall, 10);
        // tiny still gets the residue column as the last child
        let names: Vec<&str> =
            rects.iter().filter_map(|r| r.frame.as_ref()).map(|f| &*f.function).collect();
        assert_eq!(names, vec!["big", "tiny", "deeper"]);

        let rects = layout(&root, ProfileMode::Wall, 50);
        assert_eq!(rects[1].width + rects[2].width, 50);

        let mut root = CallTreeNode::root();
        root.fold([&frame("tiny"), &frame("deeper")], wall(1));
        root.fold([&frame("big")], wall(99));
        let rects = layout(&root, ProfileMode::Wall, 10);
        let names: Vec<&str> =
            rects.iter().filter_map(|r| r.frame.as_ref()).map(|f| &*f.function).collect();
        assert_eq!(names, vec!["big"]);
    }

    #[test]
    fn test_own_time_leaves_gap() {
        let mut root = CallTreeNode::root();
        root.fold([&frame("main")], wall(50));
        root.fold([&frame("main"), &frame("child")], wall(50));

        let rects = layout(&root, ProfileMode::Wall, 10);
        assert_eq!(rects[1].width, 10);
        assert_eq!(rects[2].width, 5);
        assert_eq!(height(&rects), 3);
    }

    #[test]
    fn test_deep_stack_does_not_overflow() {
        let frames: Vec<Frame> = (0..400).map(|i| Frame::new("f", "deep.py", i)).collect();
        let mut root = CallTreeNode::root();
        root.fold(frames.iter(), wall(1));
        let rects = layout(&root, ProfileMode::Wall, 80);
        assert_eq!(rects.len(), 401);
        assert!(rects.iter().all(|r| r.width == 80));
    }

    #[test]
    fn test_empty_tree_has_no_rects() {
        assert!(layout(&CallTreeNode::root(), ProfileMode::Wall, 80).is_empty());
    }
}
