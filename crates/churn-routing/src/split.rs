//! Budget-splitting floods
//!
//! Both variants divide a finite hop budget among diverging branches instead
//! of handing every branch the full amount. Shares come from
//! [`Budget::split`]: integer division with the remainder going to the
//! lowest-id targets. Each branch pays its own hop out of its share, so a
//! zero share spawns nothing.

use rand::RngCore;

use churn_core::{Algorithm, NetworkView, NodeId, Ttl};

use crate::copy::{Budget, MessageCopy};
use crate::strategy::{Forward, Forwarder, bounded_budget, flood_targets};

/// Relay to `targets`, dividing the copy's budget among them
fn split_among(copy: &MessageCopy, targets: Vec<NodeId>) -> Forward {
    let had_targets = !targets.is_empty();
    let shares = copy.budget.split(targets.len());
    let children = targets
        .into_iter()
        .zip(shares)
        .filter_map(|(next, share)| {
            share
                .after_hop()
                .map(|budget| copy.hop_to(next, budget, true))
        })
        .collect();
    Forward::from_children(children, had_targets)
}

/// Relay to `targets`, each child keeping the full post-hop budget
fn pass_through(copy: &MessageCopy, targets: Vec<NodeId>) -> Forward {
    let Some(budget) = copy.budget.after_hop() else {
        return Forward::Exhausted;
    };
    let children = targets
        .into_iter()
        .map(|next| copy.hop_to(next, budget, true))
        .collect();
    Forward::from_children(children, false)
}

/// Divides the whole budget once, among the origin's neighbors
///
/// After the origin every branch floods like `bfs-ttl` on its own share.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarlySplitFlood;

impl Forwarder for EarlySplitFlood {
    fn algorithm(&self) -> Algorithm {
        Algorithm::BfsTtlEarlySplit
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
        if copy.at_destination() {
            return Forward::Delivered;
        }
        let targets = flood_targets(copy, view, true);
        if copy.is_origin() {
            split_among(copy, targets)
        } else {
            pass_through(copy, targets)
        }
    }
}

/// Divides the remaining budget at every node with more than one target
///
/// A node with a single target passes the budget through (minus the hop).
#[derive(Debug, Clone, Copy, Default)]
pub struct LateSplitFlood;

impl Forwarder for LateSplitFlood {
    fn algorithm(&self) -> Algorithm {
        Algorithm::BfsTtlLateSplit
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
        if copy.at_destination() {
            return Forward::Delivered;
        }
        let targets = flood_targets(copy, view, true);
        if targets.len() > 1 {
            split_among(copy, targets)
        } else {
            pass_through(copy, targets)
        }
    }

    /// Shares depend on the visits along each path, so arrivals stay apart
    fn merges_arrivals(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::flood::TtlFlood;
    use crate::strategy::test_support::*;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0)
    }

    fn budgets(children: &[MessageCopy]) -> Vec<Option<u32>> {
        children.iter().map(|c| c.budget.remaining()).collect()
    }

    /// Star centred on 0 with leaves 1..=3, plus 1 - 4 - 5 behind leaf 1
    fn star() -> FixedGraph {
        FixedGraph::from_edges(7, &[(0, 1), (0, 2), (0, 3), (1, 4), (4, 5)])
    }

    #[test]
    fn test_early_split_divides_at_origin() {
        let children = EarlySplitFlood
            .forward(&origin(0, 6, Budget::Remaining(10)), &star(), &mut rng())
            .into_children();
        // shares 4, 3, 3 and each branch pays one hop
        assert_eq!(holders(&children), vec![1, 2, 3]);
        assert_eq!(budgets(&children), vec![Some(3), Some(2), Some(2)]);
    }

    #[test]
    fn test_early_split_never_redivides() {
        let graph = FixedGraph::from_edges(5, &[(0, 1), (1, 2), (1, 3)]);
        let first = EarlySplitFlood
            .forward(&origin(0, 4, Budget::Remaining(6)), &graph, &mut rng())
            .into_children();
        assert_eq!(budgets(&first), vec![Some(5)]);

        // Node 1 branches to 2 and 3 but keeps the full post-hop budget
        let second = EarlySplitFlood
            .forward(&first[0], &graph, &mut rng())
            .into_children();
        assert_eq!(holders(&second), vec![2, 3]);
        assert_eq!(budgets(&second), vec![Some(4), Some(4)]);
    }

    #[test]
    fn test_early_split_drops_zero_shares() {
        let children = EarlySplitFlood
            .forward(&origin(0, 6, Budget::Remaining(2)), &star(), &mut rng())
            .into_children();
        // shares 1, 1, 0: the third branch is never spawned
        assert_eq!(holders(&children), vec![1, 2]);
        assert_eq!(budgets(&children), vec![Some(0), Some(0)]);

        assert_eq!(
            EarlySplitFlood.forward(&origin(0, 6, Budget::Remaining(0)), &star(), &mut rng()),
            Forward::Exhausted
        );
    }

    #[test]
    fn test_late_split_passes_through_single_target() {
        let graph = FixedGraph::from_edges(5, &[(0, 1), (1, 2), (1, 3)]);
        let first = LateSplitFlood
            .forward(&origin(0, 4, Budget::Remaining(7)), &graph, &mut rng())
            .into_children();
        assert_eq!(budgets(&first), vec![Some(6)]);

        // Node 1 has two unvisited neighbors: 6 splits 3 / 3, minus the hop
        let second = LateSplitFlood
            .forward(&first[0], &graph, &mut rng())
            .into_children();
        assert_eq!(holders(&second), vec![2, 3]);
        assert_eq!(budgets(&second), vec![Some(2), Some(2)]);
    }

    #[test]
    fn test_late_split_remainder_goes_to_lowest_ids() {
        let children = LateSplitFlood
            .forward(&origin(0, 6, Budget::Remaining(5)), &star(), &mut rng())
            .into_children();
        // shares 2, 2, 1
        assert_eq!(budgets(&children), vec![Some(1), Some(1), Some(0)]);
    }

    #[test]
    fn test_split_children_never_exceed_ttl_flood() {
        let graph = star();
        let copy = origin(0, 6, Budget::Remaining(4));
        let plain = TtlFlood.forward(&copy, &graph, &mut rng()).into_children();
        for split in [
            EarlySplitFlood.forward(&copy, &graph, &mut rng()).into_children(),
            LateSplitFlood.forward(&copy, &graph, &mut rng()).into_children(),
        ] {
            assert!(split.len() <= plain.len());
            for child in &split {
                let twin = plain.iter().find(|c| c.holder == child.holder).unwrap();
                assert!(child.budget.remaining() <= twin.budget.remaining());
            }
        }
    }
}
