//! Random-walk forwarding

use rand::{Rng, RngCore};

use churn_core::{Algorithm, NetworkView, Ttl};

use crate::copy::{Budget, MessageCopy};
use crate::strategy::{Forward, Forwarder};

/// Moves the single copy to one neighbor chosen uniformly at random
///
/// The budget only matters when the TTL is finite.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomForward;

impl Forwarder for RandomForward {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Random
    }

    fn initial_budget(&self, ttl: Ttl, _node_count: usize) -> Budget {
        ttl.hops().map(Budget::Remaining).unwrap_or(Budget::Unlimited)
    }

    fn forward(
        &self,
        copy: &MessageCopy,
        view: &dyn NetworkView,
        rng: &mut dyn RngCore,
    ) -> Forward {
        if copy.at_destination() {
            return Forward::Delivered;
        }
        let Some(budget) = copy.budget.after_hop() else {
            return Forward::Exhausted;
        };
        let neighbors = view.neighbors(copy.holder);
        if neighbors.is_empty() {
            return Forward::Stranded;
        }
        let next = neighbors[rng.random_range(0..neighbors.len())];
        Forward::Relayed(vec![copy.hop_to(next, budget, false)])
    }
}
