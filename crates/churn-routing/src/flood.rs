//! Flooding strategies
//!
//! A flood relays a copy to every eligible neighbor of its holder at once.
//! The three variants here differ only in the hop budget and in whether the
//! copy's visited set is consulted:
//!
//! | variant        | budget          | loop prevention |
//! |----------------|-----------------|-----------------|
//! | `bfs`          | unlimited       | visited set     |
//! | `bfs-ttl`      | finite, -1/hop  | visited set     |
//! | `bfs-loops`    | finite, -1/hop  | none            |

use rand::RngCore;

use churn_core::{Algorithm, NetworkView, Ttl};

use crate::copy::{Budget, MessageCopy};
use crate::strategy::{Forward, Forwarder, bounded_budget, flood_targets};

/// Relay `copy` to each target with the same post-hop budget
fn flood(copy: &MessageCopy, view: &dyn NetworkView, loop_free: bool) -> Forward {
    if copy.at_destination() {
        return Forward::Delivered;
    }
    let Some(budget) = copy.budget.after_hop() else {
        return Forward::Exhausted;
    };
    let children = flood_targets(copy, view, loop_free)
        .into_iter()
        .map(|next| copy.hop_to(next, budget, loop_free))
        .collect();
    Forward::from_children(children, false)
}

/// Naive flood: every unvisited neighbor, no hop limit
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveFlood;

impl Forwarder for NaiveFlood {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Bfs
    }

    fn initial_budget(&self, _ttl: Ttl, _node_count: usize) -> Budget {
        Budget::Unlimited
    }

    fn forward(
        &self,
        copy: &MessageCopy,
        view: &dyn NetworkView,
        _rng: &mut dyn RngCore,
    ) -> Forward {
        flood(copy, view, true)
    }
}

/// Flood bounded by a per-copy hop budget
#[derive(Debug, Clone, Copy, Default)]
pub struct TtlFlood;

impl Forwarder for TtlFlood {
    fn algorithm(&self) -> Algorithm {
        Algorithm::BfsTtl
    }

    fn initial_budget(&self, ttl: Ttl, node_count: usize) -> Budget {
        bounded_budget(ttl, node_count)
    }

    fn forward(
        &self,
        copy: &MessageCopy,
        view: &dyn NetworkView,
        _rng: &mut dyn RngCore,
    ) -> Forward {
        flood(copy, view, true)
    }
}

/// Budget-bounded flood that may revisit nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopingFlood;

impl Forwarder for LoopingFlood {
    fn algorithm(&self) -> Algorithm {
        Algorithm::BfsLoops
    }

    fn initial_budget(&self, ttl: Ttl, node_count: usize) -> Budget {
        bounded_budget(ttl, node_count)
    }

    fn forward(
        &self,
        copy: &MessageCopy,
        view: &dyn NetworkView,
        _rng: &mut dyn RngCore,
    ) -> Forward {
        flood(copy, view, false)
    }
}
