//! # Churn Core
//!
//! Core types, configuration and errors for the churn routing simulator.
//!
//! The simulator benchmarks message routing over a network whose topology
//! changes every step. This crate holds everything the topology, routing and
//! simulation layers have to agree on:
//!
//! - [`NodeId`], [`MessageId`], [`Ttl`] and [`Position`]
//! - [`NetworkView`]: the read-only snapshot a routing strategy consumes
//! - [`SimConfig`]: the validated configuration surface
//! - [`ConfigError`] and [`SimError`]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{
    Algorithm, Metric, SimConfig, SweepParameter, TopologyKind, check_unit_interval,
};
pub use error::{ConfigError, SimError, SimResult};
pub use traits::NetworkView;
pub use types::{MessageId, NodeId, Position, Ttl};
