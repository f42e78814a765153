//! Simulation configuration surface
//!
//! Every option is independently overridable and the whole configuration is
//! validated up front by [`SimConfig::validate`]; a simulation never starts
//! from an invalid configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Ttl;

/// Family of dynamic topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TopologyKind {
    /// Uniform random graph with per-pair churn
    #[default]
    Random,
    /// Proximity graph over moving points in the unit square
    Geo,
}

impl TopologyKind {
    pub fn name(self) -> &'static str {
        match self {
            TopologyKind::Random => "random",
            TopologyKind::Geo => "geo",
        }
    }
}

/// Routing algorithm selected for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    /// Single copy moved to a random neighbor each hop
    #[default]
    Random,
    /// Naive flood to every unvisited neighbor, no hop limit
    Bfs,
    /// Flood bounded by a per-copy hop budget
    BfsTtl,
    /// Hop budget divided once among the origin's neighbors
    BfsTtlEarlySplit,
    /// Hop budget divided at every branching node
    BfsTtlLateSplit,
    /// Budget-bounded flood without loop prevention
    BfsLoops,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Random,
        Algorithm::Bfs,
        Algorithm::BfsTtl,
        Algorithm::BfsTtlEarlySplit,
        Algorithm::BfsTtlLateSplit,
        Algorithm::BfsLoops,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Random => "random",
            Algorithm::Bfs => "bfs",
            Algorithm::BfsTtl => "bfs-ttl",
            Algorithm::BfsTtlEarlySplit => "bfs-ttl-early-split",
            Algorithm::BfsTtlLateSplit => "bfs-ttl-late-split",
            Algorithm::BfsLoops => "bfs-loops",
        }
    }
}

/// Summary metric that can be reported or swept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    #[default]
    FractionDelivered,
    AverageHops,
    AverageLatency,
    MedianLatency,
    TransmissionsPerMessage,
    PeakActiveCopies,
    MeanNodeLoad,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::FractionDelivered,
        Metric::AverageHops,
        Metric::AverageLatency,
        Metric::MedianLatency,
        Metric::TransmissionsPerMessage,
        Metric::PeakActiveCopies,
        Metric::MeanNodeLoad,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::FractionDelivered => "fraction_delivered",
            Metric::AverageHops => "average_hops",
            Metric::AverageLatency => "average_latency",
            Metric::MedianLatency => "median_latency",
            Metric::TransmissionsPerMessage => "transmissions_per_message",
            Metric::PeakActiveCopies => "peak_active_copies",
            Metric::MeanNodeLoad => "mean_node_load",
        }
    }
}

/// Parameter a heatmap axis can sweep over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SweepParameter {
    Density,
    Volatility,
    Ttl,
}

impl SweepParameter {
    pub fn name(self) -> &'static str {
        match self {
            SweepParameter::Density => "density",
            SweepParameter::Volatility => "volatility",
            SweepParameter::Ttl => "ttl",
        }
    }

    /// Check that `value` is meaningful for this parameter
    pub fn check(self, value: f64) -> Result<(), ConfigError> {
        let ok = match self {
            SweepParameter::Density | SweepParameter::Volatility => {
                (0.0..=1.0).contains(&value)
            }
            SweepParameter::Ttl => value.is_finite() && value >= 0.0 && value <= u32::MAX as f64,
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidSweepValue {
                parameter: self.name(),
                value,
            })
        }
    }

    /// Return a copy of `config` with this parameter set to `value`
    ///
    /// `value` must have passed [`SweepParameter::check`].
    pub fn apply(self, config: &SimConfig, value: f64) -> SimConfig {
        let mut config = config.clone();
        match self {
            SweepParameter::Density => config.density = value,
            SweepParameter::Volatility => config.volatility = value,
            SweepParameter::Ttl => config.ttl = Ttl::Hops(value.round() as u32),
        }
        config
    }
}

macro_rules! named_enum {
    ($ty:ty, $err:ident, [$($variant:expr),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.name() == wanted)
                    .ok_or_else(|| ConfigError::$err(s.to_string()))
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.name().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

named_enum!(TopologyKind, UnknownTopology, [TopologyKind::Random, TopologyKind::Geo]);
named_enum!(
    Algorithm,
    UnknownAlgorithm,
    [
        Algorithm::Random,
        Algorithm::Bfs,
        Algorithm::BfsTtl,
        Algorithm::BfsTtlEarlySplit,
        Algorithm::BfsTtlLateSplit,
        Algorithm::BfsLoops,
    ]
);
named_enum!(
    Metric,
    UnknownMetric,
    [
        Metric::FractionDelivered,
        Metric::AverageHops,
        Metric::AverageLatency,
        Metric::MedianLatency,
        Metric::TransmissionsPerMessage,
        Metric::PeakActiveCopies,
        Metric::MeanNodeLoad,
    ]
);
named_enum!(
    SweepParameter,
    UnknownSweepParameter,
    [
        SweepParameter::Density,
        SweepParameter::Volatility,
        SweepParameter::Ttl,
    ]
);

/// Configuration for one simulation trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of nodes in the network
    pub num_nodes: usize,
    /// Number of messages in the generated workload
    pub num_messages: usize,
    /// Number of steps the run executes
    pub num_steps: u64,
    /// Initial hop budget per message
    pub ttl: Ttl,
    /// Expected initial connectivity in [0, 1]
    pub density: f64,
    /// Rate of topology change per step in [0, 1]
    pub volatility: f64,
    /// Topology family
    pub topology: TopologyKind,
    /// Routing algorithm
    pub alg: Algorithm,
    /// Metrics to report (first one drives heatmaps)
    #[serde(rename = "metric")]
    pub metrics: Vec<Metric>,
    /// Export per-step frames for rendering
    pub graphics: bool,
    /// Run a multi-trial heatmap sweep instead of a single trial
    pub heatmap: bool,
    /// Compute and report the detailed metrics
    pub verbose: bool,
    /// Seed for every random stream of the trial
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_nodes: 100,
            num_messages: 1000,
            num_steps: 250,
            ttl: Ttl::Unbounded,
            density: 0.5,
            volatility: 0.5,
            topology: TopologyKind::Random,
            alg: Algorithm::Random,
            metrics: vec![Metric::FractionDelivered],
            graphics: false,
            heatmap: false,
            verbose: false,
            seed: 0,
        }
    }
}

impl SimConfig {
    /// Validate every option, failing on the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_nodes == 0 {
            return Err(ConfigError::NonPositive("num_nodes"));
        }
        if self.num_nodes < 2 {
            return Err(ConfigError::TooFewNodes(self.num_nodes));
        }
        if u32::try_from(self.num_nodes).is_err() {
            return Err(ConfigError::TooManyNodes(self.num_nodes));
        }
        if self.num_messages == 0 {
            return Err(ConfigError::NonPositive("num_messages"));
        }
        if self.num_steps == 0 {
            return Err(ConfigError::NonPositive("num_steps"));
        }
        check_unit_interval("density", self.density)?;
        check_unit_interval("volatility", self.volatility)?;
        if self.metrics.is_empty() {
            return Err(ConfigError::NoMetrics);
        }
        Ok(())
    }

    /// Set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Check that `value` lies in [0, 1] (NaN fails)
pub fn check_unit_interval(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}
