//! Pre-defined scenarios on fixed topologies
//!
//! Small, fully determined setups whose outcome is known in advance. Each one
//! fixes the topology, the workload and the routing algorithm.

use clap::ValueEnum;
use tracing::info;

use churn_core::{Algorithm, SimConfig, SimResult, Ttl};

use crate::metrics::TrialReport;
use crate::simulation::Simulation;
use crate::topology::{Snapshot, Topology};
use crate::workload::{ScheduledMessage, Workload};

/// Built-in scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Two connected nodes, random walk from 0 to 1: delivered at step 1
    TwoNode,
    /// Line 0-1-2-3-4 flooded with ttl 3 from 0 to 4: never delivered
    LineTtl,
    /// Line 0-1-2-3-4 flooded without a hop limit: delivered at step 4
    LineFlood,
    /// Triangle 0-1-2 plus an unreachable node 3, looping flood with ttl 3
    TriangleLoops,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::TwoNode,
        Scenario::LineTtl,
        Scenario::LineFlood,
        Scenario::TriangleLoops,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::TwoNode => "two-node",
            Scenario::LineTtl => "line-ttl",
            Scenario::LineFlood => "line-flood",
            Scenario::TriangleLoops => "triangle-loops",
        }
    }

    /// Configuration the scenario runs with
    pub fn config(self) -> SimConfig {
        let (num_nodes, num_steps, alg, ttl) = match self {
            Scenario::TwoNode => (2, 1, Algorithm::Random, Ttl::Unbounded),
            Scenario::LineTtl => (5, 10, Algorithm::BfsTtl, Ttl::Hops(3)),
            Scenario::LineFlood => (5, 10, Algorithm::Bfs, Ttl::Unbounded),
            Scenario::TriangleLoops => (4, 6, Algorithm::BfsLoops, Ttl::Hops(3)),
        };
        SimConfig {
            num_nodes,
            num_messages: 1,
            num_steps,
            ttl,
            density: 0.0,
            volatility: 0.0,
            alg,
            verbose: true,
            ..Default::default()
        }
    }

    /// Fixed snapshot the scenario runs on
    pub fn snapshot(self) -> SimResult<Snapshot> {
        match self {
            Scenario::TwoNode => Ok(Snapshot::complete(2)),
            Scenario::LineTtl | Scenario::LineFlood => Ok(Snapshot::line(5)),
            Scenario::TriangleLoops => Snapshot::from_edges(4, &[(0, 1), (1, 2), (0, 2)]),
        }
    }

    /// The single message of the scenario
    pub fn message(self) -> ScheduledMessage {
        match self {
            Scenario::TwoNode => ScheduledMessage::new(1, 0, 1),
            Scenario::LineTtl | Scenario::LineFlood => ScheduledMessage::new(1, 0, 4),
            Scenario::TriangleLoops => ScheduledMessage::new(1, 0, 3),
        }
    }

    /// Build the scenario's simulation with `config` in place of the default
    pub fn build_with(self, config: SimConfig) -> SimResult<Simulation> {
        let workload = Workload::from_schedule(&[self.message()], config.num_nodes, config.ttl)?;
        Simulation::with_topology(config, Topology::fixed(self.snapshot()?))?.with_workload(workload)
    }

    pub fn build(self) -> SimResult<Simulation> {
        self.build_with(self.config())
    }
}

/// Run a scenario to completion
pub fn run_scenario(scenario: Scenario) -> SimResult<TrialReport> {
    info!("=== Running {} scenario ===", scenario.name());
    let mut sim = scenario.build()?;
    let report = sim.run()?;
    info!(
        "{} scenario: {}/{} delivered after {} steps",
        scenario.name(),
        report.delivered,
        report.total_messages,
        report.steps
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use churn_core::MessageId;

    use super::*;

    #[test]
    fn test_two_node_delivers_at_step_one() {
        let mut sim = Scenario::TwoNode.build().unwrap();
        sim.run().unwrap();
        assert_eq!(sim.tracker().delivered_step(MessageId(0)), Some(1));
    }

    #[test]
    fn test_line_outcomes() {
        let report = run_scenario(Scenario::LineTtl).unwrap();
        assert_eq!(report.fraction_delivered, 0.0);

        let mut sim = Scenario::LineFlood.build().unwrap();
        sim.run().unwrap();
        assert_eq!(sim.tracker().delivered_step(MessageId(0)), Some(4));
    }

    #[test]
    fn test_names_match_cli_values() {
        for scenario in Scenario::ALL {
            let parsed = Scenario::from_str(scenario.name(), true).unwrap();
            assert_eq!(parsed, scenario);
        }
    }
}
