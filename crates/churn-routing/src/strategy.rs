//! Routing strategy selection
//!
//! Every algorithm implements [`Forwarder`]. The algorithm named in the
//! configuration is turned into a boxed forwarder once, by [`forwarder`],
//! and the tracker calls it for every live copy without re-checking the
//! algorithm.

use rand::RngCore;

use churn_core::{Algorithm, NetworkView, NodeId, Ttl};

use crate::copy::{Budget, MessageCopy};
use crate::flood::{LoopingFlood, NaiveFlood, TtlFlood};
use crate::random::RandomForward;
use crate::split::{EarlySplitFlood, LateSplitFlood};

/// Outcome of handing one copy to a strategy for one hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Forward {
    /// The holder is the destination
    ///
    /// The tracker detects arrivals as they are spawned, so this only shows up
    /// when a copy already at its destination is forwarded directly.
    Delivered,
    /// The copy moved on; never empty
    Relayed(Vec<MessageCopy>),
    /// No eligible neighbor to forward to
    Stranded,
    /// The remaining budget can't pay for another hop
    Exhausted,
}

impl Forward {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Forward::Delivered)
    }

    /// Copies spawned by this hop (empty unless relayed)
    pub fn into_children(self) -> Vec<MessageCopy> {
        match self {
            Forward::Relayed(children) => children,
            _ => Vec::new(),
        }
    }

    /// Wrap spawned children, classifying an empty result
    pub(crate) fn from_children(children: Vec<MessageCopy>, had_targets: bool) -> Self {
        if !children.is_empty() {
            Forward::Relayed(children)
        } else if had_targets {
            Forward::Exhausted
        } else {
            Forward::Stranded
        }
    }
}

/// Hop-by-hop forwarding policy
pub trait Forwarder: Send + Sync {
    /// Algorithm this forwarder implements
    fn algorithm(&self) -> Algorithm;

    /// Budget given to a message's origin copy
    fn initial_budget(&self, ttl: Ttl, node_count: usize) -> Budget;

    /// Decide where `copy` goes next on the current snapshot
    ///
    /// Randomness, when needed, comes only from `rng`.
    fn forward(&self, copy: &MessageCopy, view: &dyn NetworkView, rng: &mut dyn RngCore)
    -> Forward;

    /// Whether copies of one message arriving at the same holder merge
    ///
    /// When `false` every copy keeps its own path, visits and budget.
    fn merges_arrivals(&self) -> bool {
        true
    }
}

/// Build the forwarder for `algorithm`
pub fn forwarder(algorithm: Algorithm) -> Box<dyn Forwarder> {
    match algorithm {
        Algorithm::Random => Box::new(RandomForward),
        Algorithm::Bfs => Box::new(NaiveFlood),
        Algorithm::BfsTtl => Box::new(TtlFlood),
        Algorithm::BfsTtlEarlySplit => Box::new(EarlySplitFlood),
        Algorithm::BfsTtlLateSplit => Box::new(LateSplitFlood),
        Algorithm::BfsLoops => Box::new(LoopingFlood),
    }
}

/// Finite budget for the TTL-bounded floods
///
/// An unbounded TTL falls back to one hop per node in the network.
pub(crate) fn bounded_budget(ttl: Ttl, node_count: usize) -> Budget {
    let fallback = u32::try_from(node_count).unwrap_or(u32::MAX);
    Budget::Remaining(ttl.or_hops(fallback))
}

/// Neighbors of the holder a flood may forward to, ascending
pub(crate) fn flood_targets(
    copy: &MessageCopy,
    view: &dyn NetworkView,
    avoid_visited: bool,
) -> Vec<NodeId> {
    view.neighbors(copy.holder)
        .iter()
        .copied()
        .filter(|n| !(avoid_visited && copy.was_visited(*n)))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeSet;

    use churn_core::{MessageId, NetworkView, NodeId};

    use crate::copy::{Budget, MessageCopy};

    /// Fixed adjacency used by the strategy tests
    pub struct FixedGraph {
        adjacency: Vec<Vec<NodeId>>,
    }

    impl FixedGraph {
        pub fn from_edges(count: usize, edges: &[(u32, u32)]) -> Self {
            let mut sets = vec![BTreeSet::new(); count];
            for &(a, b) in edges {
                sets[a as usize].insert(NodeId(b));
                sets[b as usize].insert(NodeId(a));
            }
            Self {
                adjacency: sets.into_iter().map(|s| s.into_iter().collect()).collect(),
            }
        }
    }

    impl NetworkView for FixedGraph {
        fn node_count(&self) -> usize {
            self.adjacency.len()
        }

        fn neighbors(&self, node: NodeId) -> &[NodeId] {
            self.adjacency
                .get(node.index())
                .map(Vec::as_slice)
                .unwrap_or(&[])
        }
    }

    pub fn origin(source: u32, destination: u32, budget: Budget) -> MessageCopy {
        MessageCopy::origin(MessageId(0), NodeId(source), NodeId(destination), budget)
    }

    pub fn holders(children: &[MessageCopy]) -> Vec<u32> {
        children.iter().map(|c| c.holder.0).collect()
    }
}
