//! Core identifiers and value types shared by every layer of the simulator

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Stable identifier of a node for the whole run (0-based index)
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Index of this node in per-node tables
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// All node ids of a network with `count` nodes, ascending
    pub fn range(count: usize) -> impl Iterator<Item = NodeId> {
        (0..count as u32).map(NodeId)
    }
}

/// Identifier of a message within one workload
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("m{_0}")]
pub struct MessageId(pub u64);

/// Initial hop budget given to a message
///
/// Serialized as an optional integer: `null` is unbounded. Negative values
/// are rejected during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Option<i64>", into = "Option<i64>")]
pub enum Ttl {
    /// No hop limit
    #[default]
    Unbounded,
    /// At most this many hops
    Hops(u32),
}

impl Ttl {
    /// Finite hop count, if any
    pub fn hops(self) -> Option<u32> {
        match self {
            Ttl::Unbounded => None,
            Ttl::Hops(h) => Some(h),
        }
    }

    /// Resolve to a finite hop count, using `fallback` when unbounded
    pub fn or_hops(self, fallback: u32) -> u32 {
        self.hops().unwrap_or(fallback)
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Ttl::Unbounded)
    }
}

impl TryFrom<Option<i64>> for Ttl {
    type Error = ConfigError;

    fn try_from(value: Option<i64>) -> Result<Self, Self::Error> {
        match value {
            None => Ok(Ttl::Unbounded),
            Some(v) if v < 0 => Err(ConfigError::NegativeTtl(v)),
            Some(v) => u32::try_from(v)
                .map(Ttl::Hops)
                .map_err(|_| ConfigError::TtlTooLarge(v)),
        }
    }
}

impl From<Ttl> for Option<i64> {
    fn from(ttl: Ttl) -> Self {
        ttl.hops().map(i64::from)
    }
}

impl std::fmt::Display for Ttl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ttl::Unbounded => write!(f, "unbounded"),
            Ttl::Hops(h) => write!(f, "{}", h),
        }
    }
}

/// Location of a node in the unit square (geospatial topology only)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Clamp both coordinates into the unit square
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}
