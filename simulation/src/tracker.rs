//! Message lifecycle tracking
//!
//! The [`MessageTracker`] owns every in-flight [`MessageCopy`], keyed by
//! (message, holder). Copies meeting at one holder merge unless the forwarder
//! keeps arrivals apart. Each step it hands every copy to the configured
//! [`Forwarder`], detects deliveries on arrival and retires copies that are
//! stranded, exhausted or made redundant by a delivery.

use std::collections::BTreeMap;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use churn_core::{MessageId, NetworkView, NodeId};
use churn_routing::{Forward, Forwarder, MessageCopy};

use crate::rng;
use crate::workload::Message;

/// Where a message stands in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Not injected yet
    Pending,
    /// At least one copy is still travelling
    InFlight,
    /// Reached its destination
    Delivered { step: u64, hops: u32 },
    /// Every copy died before reaching the destination
    Dead,
}

/// First arrival of a message at its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub message: MessageId,
    pub created_step: u64,
    pub delivered_step: u64,
    pub hops: u32,
}

impl DeliveryRecord {
    /// Steps from creation through delivery, counting both
    pub fn latency(&self) -> u64 {
        self.delivered_step - self.created_step + 1
    }
}

/// Counters accumulated over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStats {
    /// Messages injected so far
    pub injected: u64,
    /// Copies spawned by forwarding (one per hop taken)
    pub transmissions: u64,
    /// Copies dropped for lack of an eligible neighbor
    pub stranded: u64,
    /// Copies dropped because their budget ran out
    pub exhausted: u64,
    /// Copies discarded because their message was delivered
    pub superseded: u64,
    /// Largest number of copies alive after any step
    pub peak_active: usize,
    /// Steps processed
    pub steps: u64,
}

/// Per-message bookkeeping
#[derive(Debug)]
struct MessageState {
    created_step: u64,
    delivery: Option<DeliveryRecord>,
    /// Copies spawned for this message
    transmissions: u64,
    /// Routing decisions of this message only
    rng: ChaCha8Rng,
}

/// Copies held per (message, holder)
type CopyMap = BTreeMap<(MessageId, NodeId), Vec<MessageCopy>>;

fn count(copies: &CopyMap) -> usize {
    copies.values().map(Vec::len).sum()
}

/// Owner of all in-flight message copies
pub struct MessageTracker {
    forwarder: Box<dyn Forwarder>,
    seed: u64,
    node_count: usize,
    copies: CopyMap,
    messages: BTreeMap<MessageId, MessageState>,
    deliveries: Vec<DeliveryRecord>,
    /// Sum over steps of the copies held by each node
    node_load: Vec<u64>,
    stats: TrackerStats,
}

impl MessageTracker {
    /// Create a tracker routing with `forwarder`
    ///
    /// `seed` is the trial seed; each message draws from its own stream.
    pub fn new(forwarder: Box<dyn Forwarder>, node_count: usize, seed: u64) -> Self {
        Self {
            forwarder,
            seed,
            node_count,
            copies: BTreeMap::new(),
            messages: BTreeMap::new(),
            deliveries: Vec::new(),
            node_load: vec![0; node_count],
            stats: TrackerStats::default(),
        }
    }

    /// Introduce `message` at its source during `step`
    ///
    /// Returns `true` if the message was delivered on the spot (source equals
    /// destination).
    pub fn inject(&mut self, message: &Message, step: u64) -> bool {
        if self.messages.contains_key(&message.id) {
            return self.is_message_delivered(message.id);
        }
        self.stats.injected += 1;
        self.messages.insert(
            message.id,
            MessageState {
                created_step: message.created_step,
                delivery: None,
                transmissions: 0,
                rng: rng::routing_stream(self.seed, message.id),
            },
        );

        if message.source == message.destination {
            self.record_delivery(message.id, step, 0);
            return true;
        }

        let budget = self
            .forwarder
            .initial_budget(message.ttl, self.node_count);
        let copy = MessageCopy::origin(message.id, message.source, message.destination, budget);
        trace!(message = %message.id, source = %message.source, destination = %message.destination, "Injected");
        self.copies.insert((message.id, message.source), vec![copy]);
        false
    }

    /// Move every live copy one hop on `view`
    ///
    /// Returns the messages delivered during this step.
    pub fn step(&mut self, view: &dyn NetworkView, step: u64) -> Vec<MessageId> {
        let current = std::mem::take(&mut self.copies);
        let merge = self.forwarder.merges_arrivals();
        let mut next = CopyMap::new();
        let mut delivered = Vec::new();

        let held = current
            .into_iter()
            .flat_map(|(key, copies)| copies.into_iter().map(move |copy| (key, copy)));
        for ((id, holder), copy) in held {
            let Some(state) = self.messages.get_mut(&id) else {
                continue;
            };
            if state.delivery.is_some() {
                self.stats.superseded += 1;
                continue;
            }

            let outcome = self.forwarder.forward(&copy, view, &mut state.rng);
            match outcome {
                // Held copies never sit at their destination: arrivals are
                // caught below and self-addressed messages at injection.
                Forward::Delivered => {
                    self.record_delivery(id, step, copy.hops);
                    delivered.push(id);
                }
                Forward::Relayed(children) => {
                    self.stats.transmissions += children.len() as u64;
                    state.transmissions += children.len() as u64;
                    trace!(message = %id, from = %holder, copies = children.len(), "Forwarded");
                    if let Some(arrived) = children.iter().find(|c| c.at_destination()) {
                        let hops = arrived.hops;
                        self.stats.superseded += (children.len() - 1) as u64;
                        self.record_delivery(id, step, hops);
                        delivered.push(id);
                        continue;
                    }
                    for child in children {
                        let arrivals = next.entry((id, child.holder)).or_default();
                        match arrivals.first_mut() {
                            Some(existing) if merge => existing.merge(child),
                            _ => arrivals.push(child),
                        }
                    }
                }
                Forward::Stranded => {
                    trace!(message = %id, at = %holder, "Stranded");
                    self.stats.stranded += 1;
                }
                Forward::Exhausted => {
                    trace!(message = %id, at = %holder, "Budget exhausted");
                    self.stats.exhausted += 1;
                }
            }
        }

        // Copies already spawned this step for messages delivered later in it
        if !delivered.is_empty() {
            let before = count(&next);
            next.retain(|(id, _), _| !delivered.contains(id));
            self.stats.superseded += (before - count(&next)) as u64;
        }

        for ((_, holder), copies) in &next {
            if let Some(load) = self.node_load.get_mut(holder.index()) {
                *load += copies.len() as u64;
            }
        }
        self.copies = next;
        self.stats.peak_active = self.stats.peak_active.max(self.active_count());
        self.stats.steps += 1;
        delivered
    }

    fn record_delivery(&mut self, id: MessageId, step: u64, hops: u32) {
        let Some(state) = self.messages.get_mut(&id) else {
            return;
        };
        if state.delivery.is_some() {
            return;
        }
        let record = DeliveryRecord {
            message: id,
            created_step: state.created_step,
            delivered_step: step,
            hops,
        };
        state.delivery = Some(record);
        self.deliveries.push(record);
        debug!(message = %id, step, hops, latency = record.latency(), "Message delivered");
    }

    /// Number of live copies
    pub fn active_count(&self) -> usize {
        count(&self.copies)
    }

    pub fn is_message_delivered(&self, id: MessageId) -> bool {
        self.delivered_step(id).is_some()
    }

    /// Step at which `id` was delivered, if it was
    pub fn delivered_step(&self, id: MessageId) -> Option<u64> {
        self.messages
            .get(&id)
            .and_then(|s| s.delivery)
            .map(|d| d.delivered_step)
    }

    /// Lifecycle status of a message
    pub fn status(&self, id: MessageId) -> MessageStatus {
        match self.messages.get(&id) {
            None => MessageStatus::Pending,
            Some(MessageState {
                delivery: Some(d), ..
            }) => MessageStatus::Delivered {
                step: d.delivered_step,
                hops: d.hops,
            },
            Some(_) if self.copies_of(id).next().is_some() => MessageStatus::InFlight,
            Some(_) => MessageStatus::Dead,
        }
    }

    /// Live copies, ordered by (message, holder)
    pub fn copies(&self) -> impl Iterator<Item = &MessageCopy> {
        self.copies.values().flatten()
    }

    /// Live copies of one message
    pub fn copies_of(&self, id: MessageId) -> impl Iterator<Item = &MessageCopy> {
        self.copies
            .range((id, NodeId(0))..=(id, NodeId(u32::MAX)))
            .flat_map(|(_, copies)| copies)
    }

    /// Copies spawned so far for one message
    pub fn transmissions_of(&self, id: MessageId) -> u64 {
        self.messages.get(&id).map_or(0, |state| state.transmissions)
    }

    /// Deliveries in the order they happened
    pub fn deliveries(&self) -> &[DeliveryRecord] {
        &self.deliveries
    }

    /// Per-node sum over steps of copies held
    pub fn node_load(&self) -> &[u64] {
        &self.node_load
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    pub fn forwarder(&self) -> &dyn Forwarder {
        self.forwarder.as_ref()
    }
}

impl std::fmt::Debug for MessageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageTracker")
            .field("algorithm", &self.forwarder.algorithm())
            .field("active", &self.active_count())
            .field("delivered", &self.deliveries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use churn_core::{Algorithm, Ttl};
    use churn_routing::{Budget, forwarder};

    use super::*;
    use crate::topology::Snapshot;

    fn message(id: u64, source: u32, destination: u32, ttl: Ttl) -> Message {
        Message {
            id: MessageId(id),
            source: NodeId(source),
            destination: NodeId(destination),
            created_step: 1,
            ttl,
        }
    }

    fn tracker(alg: Algorithm, nodes: usize) -> MessageTracker {
        MessageTracker::new(forwarder(alg), nodes, 42)
    }

    #[test]
    fn test_bfs_on_line_delivers_after_distance_steps() {
        let line = Snapshot::line(5);
        let mut t = tracker(Algorithm::Bfs, 5);
        t.inject(&message(0, 0, 4, Ttl::Unbounded), 1);
        assert_eq!(t.status(MessageId(0)), MessageStatus::InFlight);

        for step in 1..=3 {
            assert!(t.step(&line, step).is_empty());
            assert_eq!(t.active_count(), 1);
        }
        assert_eq!(t.step(&line, 4), vec![MessageId(0)]);
        assert_eq!(t.delivered_step(MessageId(0)), Some(4));
        assert_eq!(
            t.status(MessageId(0)),
            MessageStatus::Delivered { step: 4, hops: 4 }
        );
        assert_eq!(t.deliveries()[0].latency(), 4);
        assert_eq!(t.active_count(), 0);
    }

    #[test]
    fn test_delivery_retires_sibling_copies() {
        // 0 reaches 1 directly and 2 as well; 1 is the destination
        let graph = Snapshot::from_edges(4, &[(0, 1), (0, 2), (2, 3)]).unwrap();
        let mut t = tracker(Algorithm::Bfs, 4);
        t.inject(&message(0, 0, 1, Ttl::Unbounded), 1);
        assert_eq!(t.step(&graph, 1), vec![MessageId(0)]);
        assert_eq!(t.active_count(), 0);
        assert_eq!(t.stats().superseded, 1);
        assert_eq!(t.stats().transmissions, 2);

        // Stepping again must not deliver twice
        assert!(t.step(&graph, 2).is_empty());
        assert_eq!(t.deliveries().len(), 1);
    }

    #[test]
    fn test_ttl_exhaustion_kills_message() {
        let line = Snapshot::line(5);
        let mut t = tracker(Algorithm::BfsTtl, 5);
        t.inject(&message(0, 0, 4, Ttl::Hops(3)), 1);
        for step in 1..=10 {
            assert!(t.step(&line, step).is_empty());
        }
        assert!(!t.is_message_delivered(MessageId(0)));
        assert_eq!(t.status(MessageId(0)), MessageStatus::Dead);
        assert_eq!(t.stats().exhausted, 1);
    }

    #[test]
    fn test_isolated_source_is_stranded() {
        let empty = Snapshot::empty(3);
        let mut t = tracker(Algorithm::Random, 3);
        t.inject(&message(0, 0, 2, Ttl::Unbounded), 1);
        t.step(&empty, 1);
        assert_eq!(t.status(MessageId(0)), MessageStatus::Dead);
        assert_eq!(t.stats().stranded, 1);
    }

    #[test]
    fn test_self_addressed_message_delivered_at_injection() {
        let mut t = tracker(Algorithm::Random, 3);
        assert!(t.inject(&message(0, 1, 1, Ttl::Unbounded), 1));
        assert_eq!(
            t.status(MessageId(0)),
            MessageStatus::Delivered { step: 1, hops: 0 }
        );
        assert_eq!(t.active_count(), 0);
        assert_eq!(t.status(MessageId(5)), MessageStatus::Pending);
    }

    #[test]
    fn test_converging_copies_merge() {
        // Diamond 0 - {1, 2} - 3 - 4: both branches reach 3 in the same step
        let diamond = Snapshot::from_edges(5, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)]).unwrap();
        let mut t = tracker(Algorithm::BfsTtl, 5);
        t.inject(&message(0, 0, 4, Ttl::Hops(6)), 1);
        t.step(&diamond, 1);
        assert_eq!(t.active_count(), 2);
        t.step(&diamond, 2);
        let copies: Vec<_> = t.copies().collect();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].holder, NodeId(3));
        assert_eq!(copies[0].budget, Budget::Remaining(4));
        // Only the origin is common to both paths
        assert_eq!(copies[0].visited, [NodeId(0)].into_iter().collect());
        assert_eq!(t.stats().peak_active, 2);
    }

    #[test]
    fn test_late_split_keeps_converging_copies_apart() {
        let diamond = Snapshot::from_edges(5, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)]).unwrap();
        let mut t = tracker(Algorithm::BfsTtlLateSplit, 5);
        t.inject(&message(0, 0, 4, Ttl::Hops(8)), 1);
        t.step(&diamond, 1);
        t.step(&diamond, 2);

        // Shares of 4 and 4 at the origin, then one hop each through 1 and 2
        let at_three: Vec<_> = t.copies_of(MessageId(0)).collect();
        assert_eq!(at_three.len(), 2);
        assert!(at_three.iter().all(|c| c.holder == NodeId(3)));
        assert_eq!(at_three[0].visited, [NodeId(0), NodeId(1)].into_iter().collect());
        assert_eq!(at_three[1].visited, [NodeId(0), NodeId(2)].into_iter().collect());
        assert!(at_three.iter().all(|c| c.budget == Budget::Remaining(2)));
        assert_eq!(t.active_count(), 2);
        assert_eq!(t.node_load()[3], 2);
        assert_eq!(t.transmissions_of(MessageId(0)), 4);

        // The first copy splits 2 between its unvisited neighbors, reaching 4
        assert_eq!(t.step(&diamond, 3), vec![MessageId(0)]);
        assert_eq!(t.active_count(), 0);
        assert_eq!(t.transmissions_of(MessageId(0)), 6);
        assert_eq!(t.stats().superseded, 2);
    }

    #[test]
    fn test_node_load_counts_held_copies() {
        let line = Snapshot::line(3);
        let mut t = tracker(Algorithm::Bfs, 3);
        t.inject(&message(0, 0, 2, Ttl::Unbounded), 1);
        t.step(&line, 1);
        t.step(&line, 2);
        assert_eq!(t.node_load(), &[0, 1, 0]);
        assert_eq!(t.stats().steps, 2);
    }
}
