//! Message workloads
//!
//! A workload is the ordered list of messages a trial offers to the network.
//! Message ids are positions in that list.

use rand::Rng;
use serde::{Deserialize, Serialize};

use churn_core::{ConfigError, MessageId, NodeId, SimError, SimResult, Ttl};

/// One `(step, source, destination)` entry of a custom schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub step: u64,
    pub source: NodeId,
    pub destination: NodeId,
}

impl ScheduledMessage {
    pub fn new(step: u64, source: u32, destination: u32) -> Self {
        Self {
            step,
            source: NodeId(source),
            destination: NodeId(destination),
        }
    }
}

/// A message offered to the network
///
/// Immutable once created; outcomes are recorded by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub source: NodeId,
    pub destination: NodeId,
    /// Step at which the message is injected at its source
    pub created_step: u64,
    /// Initial hop budget
    pub ttl: Ttl,
}

/// Every message of one trial
#[derive(Debug, Clone, Default)]
pub struct Workload {
    messages: Vec<Message>,
    /// Indices into `messages`, ordered by (created step, id)
    injection_order: Vec<usize>,
}

impl Workload {
    fn from_messages(messages: Vec<Message>) -> Self {
        let mut injection_order: Vec<usize> = (0..messages.len()).collect();
        injection_order.sort_by_key(|&i| (messages[i].created_step, messages[i].id));
        Self {
            messages,
            injection_order,
        }
    }

    /// `count` messages between distinct random endpoints, all created at step 1
    pub fn random<R: Rng + ?Sized>(
        count: usize,
        node_count: usize,
        ttl: Ttl,
        rng: &mut R,
    ) -> SimResult<Self> {
        if node_count < 2 {
            return Err(ConfigError::TooFewNodes(node_count).into());
        }
        let bound = u32::try_from(node_count).map_err(|_| ConfigError::TooManyNodes(node_count))?;

        let messages = (0..count as u64)
            .map(|i| {
                let source = rng.random_range(0..bound);
                // Draw from the other n - 1 nodes
                let mut destination = rng.random_range(0..bound - 1);
                if destination >= source {
                    destination += 1;
                }
                Message {
                    id: MessageId(i),
                    source: NodeId(source),
                    destination: NodeId(destination),
                    created_step: 1,
                    ttl,
                }
            })
            .collect();
        Ok(Self::from_messages(messages))
    }

    /// Messages from an explicit schedule
    ///
    /// Entries scheduled at step 0 are created at step 1.
    pub fn from_schedule(
        schedule: &[ScheduledMessage],
        node_count: usize,
        ttl: Ttl,
    ) -> SimResult<Self> {
        let messages = schedule
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                for node in [entry.source, entry.destination] {
                    if node.index() >= node_count {
                        return Err(SimError::NodeOutOfRange {
                            node,
                            count: node_count,
                        });
                    }
                }
                Ok(Message {
                    id: MessageId(i as u64),
                    source: entry.source,
                    destination: entry.destination,
                    created_step: entry.step.max(1),
                    ttl,
                })
            })
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Self::from_messages(messages))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in id order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        usize::try_from(id.0).ok().and_then(|i| self.messages.get(i))
    }

    /// The `position`-th message in injection order
    pub(crate) fn nth_injection(&self, position: usize) -> Option<&Message> {
        self.injection_order
            .get(position)
            .map(|&i| &self.messages[i])
    }

    /// Largest node id referenced, if any
    pub fn max_node(&self) -> Option<NodeId> {
        self.messages
            .iter()
            .map(|m| m.source.max(m.destination))
            .max()
    }
}
