//! # Churn Simulation
//!
//! Message routing over a network whose topology changes every step.
//!
//! ## Overview
//!
//! The simulator benchmarks six routing algorithms under controllable
//! connectivity (density) and churn (volatility). A trial is a strictly
//! sequential, deterministic computation driven by one seed; parallelism only
//! exists across independent trials of a heatmap sweep.
//!
//! ## Architecture
//!
//! - **Topology** (`topology.rs`): uniform-random and geospatial graphs that
//!   mutate every step, plus fixed snapshots for scenarios
//! - **Workload** (`workload.rs`): the messages offered to the network
//! - **Tracker** (`tracker.rs`): owns every in-flight copy, detects delivery
//! - **Simulation** (`simulation.rs`): the per-step stepper
//! - **Metrics** (`metrics.rs`): step observations and trial summaries
//! - **Heatmap** (`heatmap.rs`): multi-trial sweeps over two parameters
//! - **Frames** (`frames.rs`): per-step snapshots for external renderers
//! - **Scenarios** (`scenarios.rs`): small fixed setups with known outcomes
//!
//! ## Example
//!
//! ```rust,ignore
//! use churn_simulation::*;
//!
//! let config = SimConfig {
//!     num_nodes: 50,
//!     alg: Algorithm::BfsTtl,
//!     ttl: Ttl::Hops(6),
//!     seed: 7,
//!     ..Default::default()
//! };
//! let report = Simulation::new(config)?.run()?;
//! println!("delivered {:.1}%", report.fraction_delivered * 100.0);
//! ```

pub mod frames;
pub mod heatmap;
pub mod metrics;
pub mod rng;
pub mod scenarios;
pub mod simulation;
pub mod topology;
pub mod tracker;
pub mod workload;

pub use frames::{FrameSink, JsonFrameWriter, MemoryFrameSink, StepFrame, frame_prefix};
pub use heatmap::{
    CellAccumulator, HeatmapGrid, HeatmapSpec, SweepAxis, run_heatmap, trial_seed,
};
pub use metrics::{DetailedMetrics, MetricsAggregator, StepObservation, TrialReport};
pub use scenarios::{Scenario, run_scenario};
pub use simulation::{SimState, Simulation, run_trial};
pub use topology::{Snapshot, Topology, geo_radius};
pub use tracker::{DeliveryRecord, MessageStatus, MessageTracker, TrackerStats};
pub use workload::{Message, ScheduledMessage, Workload};

// Re-export the shared types so callers need a single dependency
pub use churn_core::{
    Algorithm, ConfigError, MessageId, Metric, NetworkView, NodeId, SimConfig, SimError,
    SimResult, SweepParameter, TopologyKind, Ttl,
};
pub use churn_routing::{Budget, MessageCopy};
