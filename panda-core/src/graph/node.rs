//! Graph Nodes
//!
//! This module defines the node type that lives in the propagation graph.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

/// Unique identifier for a node in the propagation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A data port. Its inputs are its parent (for input ports) or its
    /// owning object (for output ports).
    Data,

    /// An object. Its inputs are its input ports and docked children; its
    /// outputs are its output ports and its dock.
    Object,
}

/// A node in the propagation graph.
///
/// Edges are kept in insertion order so traversals are deterministic.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    dirty: bool,
    inputs: IndexSet<NodeId>,
    outputs: IndexSet<NodeId>,
}

impl Node {
    /// Create a new node.
    pub fn new(kind: NodeKind, dirty: bool) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            dirty,
            inputs: IndexSet::new(),
            outputs: IndexSet::new(),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Whether the node's value is stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the node dirty. Returns `true` on a clean to dirty transition.
    pub(crate) fn mark_dirty(&mut self) -> bool {
        !std::mem::replace(&mut self.dirty, true)
    }

    /// Mark the node clean.
    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn add_input(&mut self, node_id: NodeId) -> bool {
        self.inputs.insert(node_id)
    }

    pub(crate) fn remove_input(&mut self, node_id: NodeId) -> bool {
        self.inputs.shift_remove(&node_id)
    }

    pub(crate) fn add_output(&mut self, node_id: NodeId) -> bool {
        self.outputs.insert(node_id)
    }

    pub(crate) fn remove_output(&mut self, node_id: NodeId) -> bool {
        self.outputs.shift_remove(&node_id)
    }

    /// Nodes this node reads from, in insertion order.
    pub fn inputs(&self) -> &IndexSet<NodeId> {
        &self.inputs
    }

    /// Nodes reading from this node, in insertion order.
    pub fn outputs(&self) -> &IndexSet<NodeId> {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn dirty_transition_is_reported_once() {
        let mut node = Node::new(NodeKind::Data, false);
        assert!(node.mark_dirty());
        assert!(!node.mark_dirty());
        node.mark_clean();
        assert!(!node.is_dirty());
        assert!(node.mark_dirty());
    }

    #[test]
    fn edges_keep_insertion_order() {
        let mut node = Node::new(NodeKind::Object, true);
        let a = NodeId::new();
        let b = NodeId::new();
        let c = NodeId::new();

        node.add_input(c);
        node.add_input(a);
        node.add_input(b);
        assert!(!node.add_input(a));
        node.remove_input(a);

        let inputs: Vec<_> = node.inputs().iter().copied().collect();
        assert_eq!(inputs, vec![c, b]);
    }
}
