//! # Churn Routing
//!
//! Hop-by-hop routing strategies for the churn simulator.
//!
//! A strategy is handed one [`MessageCopy`] and the current topology snapshot
//! and answers with a [`Forward`]: delivered, relayed to new copies, stranded
//! or exhausted. Six strategies are provided:
//!
//! - [`RandomForward`] (`random`): a single copy random-walks the graph
//! - [`NaiveFlood`] (`bfs`): flood every unvisited neighbor, no hop limit
//! - [`TtlFlood`] (`bfs-ttl`): flood with a per-copy hop budget
//! - [`EarlySplitFlood`] (`bfs-ttl-early-split`): budget divided at the origin
//! - [`LateSplitFlood`] (`bfs-ttl-late-split`): budget divided at each branch
//! - [`LoopingFlood`] (`bfs-loops`): budget-bounded flood without visited set
//!
//! ## Example
//!
//! ```rust,ignore
//! use churn_core::Algorithm;
//! use churn_routing::forwarder;
//!
//! let strategy = forwarder(Algorithm::BfsTtl);
//! let outcome = strategy.forward(&copy, &snapshot, &mut rng);
//! ```

pub mod copy;
pub mod flood;
pub mod random;
pub mod split;
pub mod strategy;

pub use copy::{Budget, MessageCopy, split_evenly};
pub use flood::{LoopingFlood, NaiveFlood, TtlFlood};
pub use random::RandomForward;
pub use split::{EarlySplitFlood, LateSplitFlood};
pub use strategy::{Forward, Forwarder, forwarder};
