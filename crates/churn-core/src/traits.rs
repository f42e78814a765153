//! Read-only view of a topology snapshot

use crate::types::NodeId;

/// Abstraction over one step's network structure
///
/// Routing strategies only ever see the network through this trait, so they
/// cannot observe anything but the current snapshot.
pub trait NetworkView {
    /// Number of nodes (constant for a run)
    fn node_count(&self) -> usize;

    /// Neighbors of `node`, sorted by ascending id
    ///
    /// Unknown nodes have no neighbors.
    fn neighbors(&self, node: NodeId) -> &[NodeId];

    /// Check if two nodes are directly connected
    fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Degree of a node
    fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    /// Number of undirected edges
    fn edge_count(&self) -> usize {
        NodeId::range(self.node_count())
            .map(|n| self.degree(n))
            .sum::<usize>()
            / 2
    }
}
