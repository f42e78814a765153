//! Simulation stepper
//!
//! Drives one trial in discrete steps. Every step:
//! 1. the topology advances
//! 2. messages scheduled for the step are injected at their sources
//! 3. every live copy takes one hop on the just-advanced snapshot
//! 4. a [`StepObservation`] is recorded
//!
//! After `num_steps` steps the simulation is finished and
//! [`Simulation::report`] summarizes the delivered / non-delivered partition.

use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};

use churn_core::{SimConfig, SimError, SimResult};
use churn_routing::forwarder;

use crate::frames::{FrameSink, StepFrame};
use crate::metrics::{MetricsAggregator, StepObservation, TrialReport};
use crate::rng::{self, TOPOLOGY_STREAM, WORKLOAD_STREAM};
use crate::topology::Topology;
use crate::tracker::MessageTracker;
use crate::workload::Workload;

/// Lifecycle of a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    NotStarted,
    Running,
    Finished,
}

/// One trial of the routing simulation
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    topology: Topology,
    /// Topology mutation stream
    topology_rng: ChaCha8Rng,
    workload: Workload,
    tracker: MessageTracker,
    metrics: MetricsAggregator,
    /// Last completed step (0 before the first)
    step: u64,
    state: SimState,
    /// Next position in the workload's injection order
    next_injection: usize,
}

impl Simulation {
    /// Validate `config` and generate its topology and default workload
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let mut topology_rng = rng::stream(config.seed, TOPOLOGY_STREAM);
        let topology = Topology::generate(
            config.topology,
            config.num_nodes,
            config.density,
            config.volatility,
            &mut topology_rng,
        )?;
        Self::assemble(config, topology, topology_rng)
    }

    /// Validate `config` and run it on a caller-supplied topology
    pub fn with_topology(config: SimConfig, topology: Topology) -> SimResult<Self> {
        config.validate()?;
        if topology.node_count() != config.num_nodes {
            return Err(SimError::NodeCountMismatch {
                expected: config.num_nodes,
                actual: topology.node_count(),
            });
        }
        let topology_rng = rng::stream(config.seed, TOPOLOGY_STREAM);
        Self::assemble(config, topology, topology_rng)
    }

    fn assemble(config: SimConfig, topology: Topology, topology_rng: ChaCha8Rng) -> SimResult<Self> {
        let mut workload_rng = rng::stream(config.seed, WORKLOAD_STREAM);
        let workload = Workload::random(
            config.num_messages,
            config.num_nodes,
            config.ttl,
            &mut workload_rng,
        )?;
        let tracker = MessageTracker::new(forwarder(config.alg), config.num_nodes, config.seed);

        info!(
            "Simulation initialized: {} nodes, {} messages, {} steps, alg={}, topology={}, density={}, volatility={}, ttl={}, seed={}",
            config.num_nodes,
            workload.len(),
            config.num_steps,
            config.alg,
            config.topology,
            config.density,
            config.volatility,
            config.ttl,
            config.seed
        );

        Ok(Self {
            config,
            topology,
            topology_rng,
            workload,
            tracker,
            metrics: MetricsAggregator::new(),
            step: 0,
            state: SimState::NotStarted,
            next_injection: 0,
        })
    }

    /// Replace the generated workload, before the first step
    pub fn with_workload(mut self, workload: Workload) -> SimResult<Self> {
        if self.state != SimState::NotStarted {
            return Err(SimError::AlreadyFinished(self.step));
        }
        if let Some(node) = workload.max_node().filter(|n| n.index() >= self.config.num_nodes) {
            return Err(SimError::NodeOutOfRange {
                node,
                count: self.config.num_nodes,
            });
        }
        self.workload = workload;
        Ok(self)
    }

    /// Execute one step
    pub fn step(&mut self) -> SimResult<StepObservation> {
        if self.state == SimState::Finished {
            return Err(SimError::AlreadyFinished(self.step));
        }
        self.state = SimState::Running;
        self.step += 1;
        let step = self.step;
        trace!("=== Step {} ===", step);

        self.topology.advance(&mut self.topology_rng);

        let mut delivered = self.inject(step);
        let snapshot = self.topology.snapshot();
        delivered += self.tracker.step(snapshot, step).len();

        let observation = self
            .metrics
            .observe(step, delivered, &self.tracker, snapshot);
        debug!(
            "Step {}: {} edges, {} active copies, {} delivered ({} total)",
            step,
            observation.edge_count,
            observation.active_copies,
            observation.delivered,
            observation.delivered_total
        );

        if step >= self.config.num_steps {
            self.state = SimState::Finished;
            info!(
                "Simulation complete at step {}: {}/{} messages delivered",
                step,
                observation.delivered_total,
                self.workload.len()
            );
        }
        Ok(observation)
    }

    /// Inject the messages due at `step`, returning how many were delivered
    /// on the spot
    fn inject(&mut self, step: u64) -> usize {
        let mut delivered = 0;
        while let Some(message) = self.workload.nth_injection(self.next_injection) {
            if message.created_step > step {
                break;
            }
            if self.tracker.inject(message, step) {
                delivered += 1;
            }
            self.next_injection += 1;
        }
        delivered
    }

    /// Run the remaining steps and summarize
    pub fn run(&mut self) -> SimResult<TrialReport> {
        while self.state != SimState::Finished {
            self.step()?;
        }
        Ok(self.report())
    }

    /// Run the remaining steps, handing a frame to `sink` after each
    pub fn run_with_sink(&mut self, sink: &mut dyn FrameSink) -> SimResult<TrialReport> {
        while self.state != SimState::Finished {
            self.step()?;
            sink.record(&self.frame())?;
        }
        Ok(self.report())
    }

    /// Frame of the current step
    pub fn frame(&self) -> StepFrame {
        StepFrame::capture(self.step, self.topology.snapshot(), self.tracker.copies())
    }

    /// Summary of the trial so far
    ///
    /// Messages not delivered by now count as non-delivered.
    pub fn report(&self) -> TrialReport {
        self.metrics
            .report(&self.config, self.workload.len(), &self.tracker)
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// Last completed step
    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn tracker(&self) -> &MessageTracker {
        &self.tracker
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    pub fn observations(&self) -> &[StepObservation] {
        self.metrics.observations()
    }
}

/// Run one complete trial of `config`
pub fn run_trial(config: &SimConfig) -> SimResult<TrialReport> {
    Simulation::new(config.clone())?.run()
}
