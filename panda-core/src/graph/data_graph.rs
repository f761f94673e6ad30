//! Propagation Graph
//!
//! The arena holding every [`Node`] of a document. Edges are plain
//! [`NodeId`] relations kept symmetric by the arena: adding `a` as an input
//! of `b` also registers `b` as an output of `a`.
//!
//! # Dirty propagation
//!
//! Dirtiness only ever travels forward along output edges. Propagation stops
//! at nodes that are already dirty, which makes it idempotent and guarantees
//! termination. Cleaning is explicit and local: [`DataGraph::clean`] is
//! called by the data and object layers once a node has consumed its inputs.
//!
//! # Cycles
//!
//! Edges that would close a loop are rejected up front, so every graph the
//! arena holds is acyclic.

use std::collections::{HashMap, HashSet, VecDeque};

use super::node::{Node, NodeId, NodeKind};
use super::GraphError;

/// Arena of propagation nodes.
#[derive(Debug, Default)]
pub struct DataGraph {
    nodes: HashMap<NodeId, Node>,
}

impl DataGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Add a node to the graph.
    pub fn add_node(&mut self, kind: NodeKind, dirty: bool) -> NodeId {
        let node = Node::new(kind, dirty);
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all edges involving this node, so no neighbor keeps a
    /// dangling reference.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&node_id)?;
        for input in node.inputs() {
            if let Some(input) = self.nodes.get_mut(input) {
                input.remove_output(node_id);
            }
        }
        for output in node.outputs() {
            if let Some(output) = self.nodes.get_mut(output) {
                output.remove_input(node_id);
            }
        }
        Some(node)
    }

    /// Get a reference to a node.
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Whether the graph holds this node.
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Kind of a node.
    pub fn kind(&self, node_id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node_id).map(Node::kind)
    }

    /// Whether a node is dirty. Unknown nodes are clean.
    pub fn is_dirty(&self, node_id: NodeId) -> bool {
        self.nodes.get(&node_id).is_some_and(Node::is_dirty)
    }

    /// Inputs of a node, in insertion order.
    pub fn inputs(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(&node_id)
            .into_iter()
            .flat_map(|node| node.inputs().iter().copied())
    }

    /// Outputs of a node, in insertion order.
    pub fn outputs(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(&node_id)
            .into_iter()
            .flat_map(|node| node.outputs().iter().copied())
    }

    /// Make `input` an input of `node`.
    ///
    /// Attaching a dependency of unknown state marks `node` dirty; the newly
    /// dirtied nodes are returned in propagation order. Adding an existing
    /// edge is a no-op.
    pub fn add_input(&mut self, node: NodeId, input: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.check(node)?;
        self.check(input)?;
        if self.nodes[&node].inputs().contains(&input) {
            return Ok(Vec::new());
        }
        if self.would_create_cycle(node, input) {
            return Err(GraphError::CyclicGraph { node, input });
        }

        if let Some(n) = self.nodes.get_mut(&node) {
            n.add_input(input);
        }
        if let Some(i) = self.nodes.get_mut(&input) {
            i.add_output(node);
        }
        Ok(self.set_dirty_value(node))
    }

    /// Remove the edge from `input` to `node`. Returns whether it existed.
    pub fn remove_input(&mut self, node: NodeId, input: NodeId) -> Result<bool, GraphError> {
        self.check(node)?;
        self.check(input)?;
        let removed = self
            .nodes
            .get_mut(&node)
            .is_some_and(|n| n.remove_input(input));
        if let Some(i) = self.nodes.get_mut(&input) {
            i.remove_output(node);
        }
        Ok(removed)
    }

    /// Whether adding `input` as an input of `node` would close a loop.
    pub fn would_create_cycle(&self, node: NodeId, input: NodeId) -> bool {
        node == input || self.reaches(node, input)
    }

    /// Whether `to` can be reached from `from` by following output edges.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(id) = queue.pop_front() {
            if id == to {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            queue.extend(self.outputs(id));
        }
        false
    }

    /// Mark a node and everything downstream of it dirty.
    ///
    /// Returns the nodes that went from clean to dirty, in depth-first
    /// output order. Calling this on an already dirty node does nothing.
    pub fn set_dirty_value(&mut self, node_id: NodeId) -> Vec<NodeId> {
        self.propagate(vec![node_id])
    }

    /// Mark everything downstream of a node dirty, leaving the node itself.
    pub fn set_dirty_outputs(&mut self, node_id: NodeId) -> Vec<NodeId> {
        let outputs: Vec<_> = self.outputs(node_id).collect();
        self.propagate(outputs)
    }

    fn propagate(&mut self, mut start: Vec<NodeId>) -> Vec<NodeId> {
        let mut dirtied = Vec::new();
        start.reverse();
        let mut stack = start;

        while let Some(node_id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            if !node.mark_dirty() {
                continue;
            }
            dirtied.push(node_id);
            stack.extend(node.outputs().iter().rev().copied());
        }

        if !dirtied.is_empty() {
            tracing::trace!(count = dirtied.len(), "propagated dirty flag");
        }
        dirtied
    }

    /// Clear a node's dirty flag.
    pub fn clean(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.mark_clean();
        }
    }

    /// Collect the dirty object nodes feeding `node_id`.
    ///
    /// Walks backward through dirty data nodes until it reaches dirty object
    /// nodes, visiting inputs in insertion order. Already visited nodes are
    /// skipped.
    pub fn dirty_sources(&self, node_id: NodeId, visited: &mut HashSet<NodeId>, out: &mut Vec<NodeId>) {
        // (node, index of its next input)
        let mut stack = vec![(node_id, 0)];
        while let Some(frame) = stack.last_mut() {
            let (current, index) = *frame;
            frame.1 += 1;
            let Some(input) = self.input_at(current, index) else {
                stack.pop();
                continue;
            };
            if !self.is_dirty(input) || !visited.insert(input) {
                continue;
            }
            match self.kind(input) {
                Some(NodeKind::Object) => out.push(input),
                Some(NodeKind::Data) => stack.push((input, 0)),
                None => {}
            }
        }
    }

    fn input_at(&self, node_id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes.get(&node_id)?.inputs().get_index(index).copied()
    }

    /// Every node reachable from `node_id` through output edges, excluding
    /// the node itself, in breadth-first order.
    pub fn downstream(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::from([node_id]);
        let mut result = Vec::new();
        let mut queue: VecDeque<_> = self.outputs(node_id).collect();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            result.push(id);
            queue.extend(self.outputs(id));
        }
        result
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn check(&self, node_id: NodeId) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node_id) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(node_id))
        }
    }
}
