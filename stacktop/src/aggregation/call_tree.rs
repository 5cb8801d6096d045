//! Per-thread call tree.
//!
//! Children are kept in first-seen order and shared behind `Arc`, so cloning a
//! tree for publication is shallow and folding a sample afterwards copies only
//! the nodes on the sample's path (`Arc::make_mut`).

use std::collections::HashMap;
use std::sync::Arc;

use stacktop_common::{Frame, Metrics};

#[derive(Debug, Clone, Default)]
pub struct CallTreeNode {
    /// `None` for the thread's root (no frame)
    frame: Option<Frame>,
    /// Metrics collected while this frame was the innermost one
    pub own: Metrics,
    /// Metrics of this node and all its descendants
    pub total: Metrics,
    children: Vec<Arc<CallTreeNode>>,
    index: HashMap<Frame, usize>,
}

impl CallTreeNode {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    fn with_frame(frame: Frame) -> Self {
        Self { frame: Some(frame), ..Self::default() }
    }

    #[must_use]
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.frame.is_none()
    }

    /// Children in the order they were first seen.
    pub fn children(&self) -> impl ExactSizeIterator<Item = &CallTreeNode> + DoubleEndedIterator {
        self.children.iter().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn child(&self, frame: &Frame) -> Option<&CallTreeNode> {
        self.index.get(frame).map(|&i| self.children[i].as_ref())
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Find the node reached by following `path` (outermost first) from here.
    #[must_use]
    pub fn descend<'a>(&self, path: impl IntoIterator<Item = &'a Frame>) -> Option<&CallTreeNode> {
        path.into_iter().try_fold(self, |node, frame| node.child(frame))
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children());
        }
        count
    }

    /// Sum of the children's totals.
    #[must_use]
    pub fn children_total(&self) -> Metrics {
        let mut sum = Metrics::default();
        for child in self.children() {
            sum += child.total;
        }
        sum
    }

    fn child_mut(&mut self, frame: &Frame) -> &mut CallTreeNode {
        let i = match self.index.get(frame) {
            Some(&i) => i,
            None => {
                self.children.push(Arc::new(CallTreeNode::with_frame(frame.clone())));
                let i = self.children.len() - 1;
                self.index.insert(frame.clone(), i);
                i
            }
        };
        Arc::make_mut(&mut self.children[i])
    }

    /// Fold one sample into the tree.
    ///
    /// `path` runs from the entry point to the leaf. Every node on the path,
    /// this one included, gains `metrics` in its total; the last one also gains
    /// them as own. An empty path charges this node directly.
    pub fn fold<'a>(&mut self, path: impl IntoIterator<Item = &'a Frame>, metrics: Metrics) {
        let mut node = self;
        node.total += metrics;
        for frame in path {
            node = node.child_mut(frame);
            node.total += metrics;
        }
        node.own += metrics;
    }
}
