//! Error types for the churn simulator

use thiserror::Error;

use crate::types::NodeId;

/// Configuration validation failures
///
/// All of these are raised before a single step executes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("unknown topology '{0}' (expected one of: random, geo)")]
    UnknownTopology(String),

    #[error(
        "unknown routing algorithm '{0}' (expected one of: random, bfs, bfs-ttl, \
         bfs-ttl-early-split, bfs-ttl-late-split, bfs-loops)"
    )]
    UnknownAlgorithm(String),

    #[error(
        "unknown metric '{0}' (expected one of: fraction_delivered, average_hops, \
         average_latency, median_latency, transmissions_per_message, peak_active_copies, \
         mean_node_load)"
    )]
    UnknownMetric(String),

    #[error("unknown sweep parameter '{0}' (expected one of: density, volatility, ttl)")]
    UnknownSweepParameter(String),

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("at least 2 nodes are required to route messages, got {0}")]
    TooFewNodes(usize),

    #[error("num_nodes {0} exceeds the supported maximum of {max}", max = u32::MAX)]
    TooManyNodes(usize),

    #[error("ttl must be non-negative, got {0}")]
    NegativeTtl(i64),

    #[error("ttl {0} exceeds the supported maximum of {max}", max = u32::MAX)]
    TtlTooLarge(i64),

    #[error("at least one metric must be selected")]
    NoMetrics,

    #[error("sweep axis '{0}' has no values")]
    EmptySweepAxis(String),

    #[error("invalid value {value} for sweep parameter {parameter}")]
    InvalidSweepValue { parameter: &'static str, value: f64 },
}

/// Errors raised by the simulation engine
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("simulation already finished after {0} steps")]
    AlreadyFinished(u64),

    #[error("node {node} is out of range for a network of {count} nodes")]
    NodeOutOfRange { node: NodeId, count: usize },

    #[error("topology has {actual} nodes but the configuration expects {expected}")]
    NodeCountMismatch { expected: usize, actual: usize },

    #[error("frame export I/O error: {0}")]
    FrameIo(#[from] std::io::Error),

    #[error("frame encoding error: {0}")]
    FrameEncode(String),

    #[error("failed to build sweep thread pool: {0}")]
    ThreadPool(String),
}

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;
