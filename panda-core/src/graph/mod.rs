//! Dependency Graph
//!
//! This module implements the propagation graph that tracks relationships
//! between data ports and the objects that consume or produce them.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are either data ports or objects ([`NodeKind`])
//! - Edges point from a dependency to its dependent: a linked data depends
//!   on its parent, an object depends on its input ports and its docked
//!   children, and an output port depends on its object
//!
//! When a value changes, every node downstream of it is marked dirty. The
//! [`NodeUpdater`] later walks back from a requested object to the dirty
//! objects it depends on and runs them in dependency order.
//!
//! # Design Decisions
//!
//! 1. A single arena owns every node and relations are [`NodeId`]s, so
//!    removing a node is a local operation and handles never dangle.
//!
//! 2. Both forward (outputs) and reverse (inputs) edges are kept, in
//!    insertion order, so traversals are deterministic.
//!
//! 3. Cycles are rejected when an edge is added, not discovered later.

mod data_graph;
mod node;
mod updater;
mod utils;

pub use data_graph::DataGraph;
pub use node::{Node, NodeId, NodeKind};
pub use updater::{NodeUpdater, UpdateError, UpdateState};
pub use utils::{
    connected_components, connected_objects, downstream_objects, neighbor_objects,
    selection_boundary, upstream_objects, SelectionBoundary,
};

/// Errors raised by graph edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The edge would close a loop.
    #[error("linking {input:?} into {node:?} would create a cycle")]
    CyclicGraph {
        /// The node that would gain an input.
        node: NodeId,
        /// The input that would be added.
        input: NodeId,
    },

    /// No node with this id exists.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
}
