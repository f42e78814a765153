//! Dynamic network topologies
//!
//! A [`Topology`] owns the current [`Snapshot`] and knows how to mutate it
//! one step at a time:
//! - Uniform: every node pair is an edge with probability `density`; each
//!   step every pair is re-drawn with probability `volatility`
//! - Geo: nodes sit in the unit square and connect within a radius derived
//!   from `density`; each step every node drifts by `volatility`
//! - Static: a fixed, caller-supplied snapshot (line, ring, star, ...)
//!
//! Randomness only ever comes from the generator passed in by the caller.

use std::f64::consts::{SQRT_2, TAU};

use rand::Rng;
use tracing::trace;

use churn_core::{
    NetworkView, NodeId, Position, SimError, SimResult, TopologyKind, check_unit_interval,
};

/// Connectivity radius of the geospatial topology for a given density
///
/// Linear in density and scaled by the unit-square diagonal, so density 1
/// connects every pair and density 0 connects none.
pub fn geo_radius(density: f64) -> f64 {
    density * SQRT_2
}

/// Undirected graph over a fixed node set, valid for one step
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Sorted neighbor list per node
    adjacency: Vec<Vec<NodeId>>,
    /// Node positions (geospatial topology only)
    positions: Option<Vec<Position>>,
}

impl Snapshot {
    /// Build a snapshot by testing every unordered pair `(a, b)` with `a < b`
    fn from_predicate(
        node_count: usize,
        positions: Option<Vec<Position>>,
        mut connected: impl FnMut(usize, usize) -> bool,
    ) -> Self {
        let mut adjacency = vec![Vec::new(); node_count];
        // Visiting pairs in lexicographic order keeps every list sorted
        for a in 0..node_count {
            for b in (a + 1)..node_count {
                if connected(a, b) {
                    adjacency[a].push(NodeId(b as u32));
                    adjacency[b].push(NodeId(a as u32));
                }
            }
        }
        Self {
            adjacency,
            positions,
        }
    }

    /// A snapshot without edges
    pub fn empty(node_count: usize) -> Self {
        Self::from_predicate(node_count, None, |_, _| false)
    }

    /// Every pair connected
    pub fn complete(node_count: usize) -> Self {
        Self::from_predicate(node_count, None, |_, _| true)
    }

    /// Line 0 - 1 - ... - (n-1)
    pub fn line(node_count: usize) -> Self {
        Self::from_predicate(node_count, None, |a, b| b == a + 1)
    }

    /// Star with node 0 as hub
    pub fn star(node_count: usize) -> Self {
        Self::from_predicate(node_count, None, |a, _| a == 0)
    }

    /// Triangle 0 - 1 - 2 - 0
    pub fn triangle() -> Self {
        Self::complete(3)
    }

    /// Build from an explicit edge list; self-loops are ignored
    pub fn from_edges(node_count: usize, edges: &[(u32, u32)]) -> SimResult<Self> {
        let mut pairs = PairTable::new(node_count);
        for &(a, b) in edges {
            for node in [a, b] {
                if node as usize >= node_count {
                    return Err(SimError::NodeOutOfRange {
                        node: NodeId(node),
                        count: node_count,
                    });
                }
            }
            if a != b {
                pairs.set(a.min(b) as usize, a.max(b) as usize, true);
            }
        }
        Ok(pairs.snapshot())
    }

    /// Edges as `(a, b)` with `a < b`, ascending
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(a, neighbors)| {
                let a = NodeId(a as u32);
                neighbors
                    .iter()
                    .filter(move |b| **b > a)
                    .map(move |b| (a, *b))
            })
            .collect()
    }

    /// Node positions, when the topology is geospatial
    pub fn positions(&self) -> Option<&[Position]> {
        self.positions.as_deref()
    }

    /// Position of one node, when the topology is geospatial
    pub fn position(&self, node: NodeId) -> Option<Position> {
        self.positions
            .as_ref()
            .and_then(|p| p.get(node.index()).copied())
    }
}

impl NetworkView for Snapshot {
    fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Edge state of every unordered pair, in lexicographic pair order
#[derive(Debug, Clone)]
struct PairTable {
    node_count: usize,
    edges: Vec<bool>,
}

impl PairTable {
    fn new(node_count: usize) -> Self {
        Self {
            node_count,
            edges: vec![false; node_count * node_count.saturating_sub(1) / 2],
        }
    }

    fn random<R: Rng + ?Sized>(node_count: usize, density: f64, rng: &mut R) -> Self {
        let mut table = Self::new(node_count);
        for edge in &mut table.edges {
            *edge = rng.random_bool(density);
        }
        table
    }

    /// Index of pair `(a, b)`, `a < b`
    fn index(&self, a: usize, b: usize) -> usize {
        a * (2 * self.node_count - a - 1) / 2 + (b - a - 1)
    }

    fn set(&mut self, a: usize, b: usize, present: bool) {
        let i = self.index(a, b);
        self.edges[i] = present;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::from_predicate(self.node_count, None, |a, b| self.edges[self.index(a, b)])
    }
}

/// How a topology changes between steps
#[derive(Debug, Clone)]
enum Evolution {
    Uniform {
        density: f64,
        volatility: f64,
        pairs: PairTable,
    },
    Geo {
        radius: f64,
        volatility: f64,
        positions: Vec<Position>,
    },
    Static,
}

/// A topology evolving step by step
#[derive(Debug, Clone)]
pub struct Topology {
    kind: Option<TopologyKind>,
    evolution: Evolution,
    snapshot: Snapshot,
}

impl Topology {
    /// Generate the initial snapshot of a `kind` topology
    pub fn generate<R: Rng + ?Sized>(
        kind: TopologyKind,
        node_count: usize,
        density: f64,
        volatility: f64,
        rng: &mut R,
    ) -> SimResult<Self> {
        check_unit_interval("density", density)?;
        check_unit_interval("volatility", volatility)?;

        let evolution = match kind {
            TopologyKind::Random => Evolution::Uniform {
                density,
                volatility,
                pairs: PairTable::random(node_count, density, rng),
            },
            TopologyKind::Geo => Evolution::Geo {
                radius: geo_radius(density),
                volatility,
                positions: (0..node_count)
                    .map(|_| Position::new(rng.random::<f64>(), rng.random::<f64>()))
                    .collect(),
            },
        };
        let snapshot = Self::build(&evolution, node_count);
        trace!(
            topology = %kind,
            nodes = node_count,
            edges = snapshot.edge_count(),
            "Generated topology"
        );

        Ok(Self {
            kind: Some(kind),
            evolution,
            snapshot,
        })
    }

    /// A topology that never changes
    pub fn fixed(snapshot: Snapshot) -> Self {
        Self {
            kind: None,
            evolution: Evolution::Static,
            snapshot,
        }
    }

    /// Mutate the topology by one step
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match &mut self.evolution {
            Evolution::Uniform {
                density,
                volatility,
                pairs,
            } => {
                for edge in &mut pairs.edges {
                    if rng.random_bool(*volatility) {
                        *edge = rng.random_bool(*density);
                    }
                }
            }
            Evolution::Geo {
                volatility,
                positions,
                ..
            } => {
                for position in positions.iter_mut() {
                    let angle = rng.random_range(0.0..TAU);
                    *position = Position::new(
                        position.x + *volatility * angle.cos(),
                        position.y + *volatility * angle.sin(),
                    )
                    .clamped();
                }
            }
            Evolution::Static => return,
        }
        self.snapshot = Self::build(&self.evolution, self.snapshot.node_count());
    }

    fn build(evolution: &Evolution, node_count: usize) -> Snapshot {
        match evolution {
            Evolution::Uniform { pairs, .. } => pairs.snapshot(),
            Evolution::Geo {
                radius, positions, ..
            } => {
                let radius = *radius;
                Snapshot::from_predicate(node_count, Some(positions.clone()), |a, b| {
                    radius > 0.0 && positions[a].distance(&positions[b]) <= radius
                })
            }
            Evolution::Static => Snapshot::empty(node_count),
        }
    }

    /// The current snapshot
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Topology family, `None` for a fixed topology
    pub fn kind(&self) -> Option<TopologyKind> {
        self.kind
    }

    pub fn node_count(&self) -> usize {
        self.snapshot.node_count()
    }
}
