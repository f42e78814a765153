//! Message copies and their hop budgets
//!
//! A [`MessageCopy`] ties one message to the node currently holding it. The
//! lifecycle tracker owns every copy; nodes and topology never do.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use churn_core::{MessageId, NodeId};

/// Remaining hop budget carried by a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Budget {
    /// No hop limit
    Unlimited,
    /// This many hops may still be taken
    Remaining(u32),
}

impl Budget {
    /// Remaining hops, or `None` when unlimited
    pub fn remaining(self) -> Option<u32> {
        match self {
            Budget::Unlimited => None,
            Budget::Remaining(r) => Some(r),
        }
    }

    /// Budget left after paying for one hop, `None` if the hop can't be paid
    pub fn after_hop(self) -> Option<Budget> {
        match self {
            Budget::Unlimited => Some(Budget::Unlimited),
            Budget::Remaining(0) => None,
            Budget::Remaining(r) => Some(Budget::Remaining(r - 1)),
        }
    }

    /// The larger of two budgets (unlimited beats everything)
    pub fn max(self, other: Budget) -> Budget {
        match (self, other) {
            (Budget::Remaining(a), Budget::Remaining(b)) => Budget::Remaining(a.max(b)),
            _ => Budget::Unlimited,
        }
    }

    /// Divide this budget among `branches` diverging branches
    ///
    /// Integer division; the first `remainder` branches get one extra hop.
    /// An unlimited budget stays unlimited on every branch.
    pub fn split(self, branches: usize) -> Vec<Budget> {
        match self {
            Budget::Unlimited => vec![Budget::Unlimited; branches],
            Budget::Remaining(total) => split_evenly(total, branches)
                .into_iter()
                .map(Budget::Remaining)
                .collect(),
        }
    }
}

/// Split `total` into `branches` shares differing by at most one
///
/// Shares are non-increasing: the first `total % branches` shares carry the
/// remainder.
pub fn split_evenly(total: u32, branches: usize) -> Vec<u32> {
    if branches == 0 {
        return Vec::new();
    }
    let branches_u = branches as u64;
    let base = (total as u64 / branches_u) as u32;
    let remainder = (total as u64 % branches_u) as usize;
    (0..branches)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// One in-flight copy of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCopy {
    /// Message this copy carries
    pub message: MessageId,
    /// Final destination of the message
    pub destination: NodeId,
    /// Node currently holding the copy
    pub holder: NodeId,
    /// Remaining hop budget
    pub budget: Budget,
    /// Hops taken from the source to reach `holder`
    pub hops: u32,
    /// Nodes this copy has already passed through (excluding `holder`)
    pub visited: BTreeSet<NodeId>,
}

impl MessageCopy {
    /// The copy injected at a message's source
    pub fn origin(message: MessageId, source: NodeId, destination: NodeId, budget: Budget) -> Self {
        Self {
            message,
            destination,
            holder: source,
            budget,
            hops: 0,
            visited: BTreeSet::new(),
        }
    }

    /// Whether this copy still sits at the message's source
    pub fn is_origin(&self) -> bool {
        self.hops == 0
    }

    pub fn at_destination(&self) -> bool {
        self.holder == self.destination
    }

    /// Check if this copy has already passed through `node`
    pub fn was_visited(&self, node: NodeId) -> bool {
        self.visited.contains(&node)
    }

    /// Child copy one hop further, at `next`, carrying `budget`
    ///
    /// With `track_visits` the current holder joins the child's visited set.
    pub fn hop_to(&self, next: NodeId, budget: Budget, track_visits: bool) -> Self {
        let mut visited = self.visited.clone();
        if track_visits {
            visited.insert(self.holder);
        }
        Self {
            message: self.message,
            destination: self.destination,
            holder: next,
            budget,
            hops: self.hops + 1,
            visited,
        }
    }

    /// Absorb another copy of the same message arriving at the same holder
    ///
    /// Keeps the larger budget, the shorter hop count and only the visits
    /// both copies share, so the merged copy can do anything either could.
    pub fn merge(&mut self, other: MessageCopy) {
        debug_assert_eq!(self.message, other.message);
        debug_assert_eq!(self.holder, other.holder);
        self.budget = self.budget.max(other.budget);
        self.hops = self.hops.min(other.hops);
        self.visited.retain(|n| other.visited.contains(n));
    }
}
