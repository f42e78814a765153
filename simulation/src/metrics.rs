//! Per-step observations and per-trial summaries

use serde::{Deserialize, Serialize};

use churn_core::{MessageId, Metric, NetworkView, SimConfig};

use crate::tracker::MessageTracker;

/// What one step looked like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepObservation {
    pub step: u64,
    /// Live copies after the step
    pub active_copies: usize,
    /// Messages delivered during the step
    pub delivered: usize,
    /// Messages delivered so far
    pub delivered_total: usize,
    /// Edges of the snapshot the step ran on
    pub edge_count: usize,
}

/// Spread of the average number of copies each node held per step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeLoad {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Richer per-trial metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedMetrics {
    /// Mean hop count of delivered messages
    pub average_hops: f64,
    /// Mean steps from creation through delivery
    pub average_latency: f64,
    pub median_latency: f64,
    /// Copies spawned over the whole run
    pub total_transmissions: u64,
    /// Copies spawned per generated message
    pub transmissions_per_message: f64,
    pub peak_active_copies: usize,
    pub stranded_copies: u64,
    pub exhausted_copies: u64,
    pub node_load: NodeLoad,
}

/// Value of one selected metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub metric: Metric,
    pub value: f64,
}

/// Outcome of a single trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    pub seed: u64,
    /// Steps executed
    pub steps: u64,
    pub total_messages: usize,
    pub delivered: usize,
    pub fraction_delivered: f64,
    /// Delivered message ids, ascending
    pub delivered_ids: Vec<MessageId>,
    /// Selected metrics, in selection order
    pub metrics: Vec<MetricValue>,
    /// Present when the trial ran verbose
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed: Option<DetailedMetrics>,
}

impl TrialReport {
    /// Value of a selected metric
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.metric == metric)
            .map(|m| m.value)
    }
}

/// Records step observations and produces the trial summary
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    observations: Vec<StepObservation>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state right after `step`
    pub fn observe(
        &mut self,
        step: u64,
        delivered: usize,
        tracker: &MessageTracker,
        view: &dyn NetworkView,
    ) -> StepObservation {
        let observation = StepObservation {
            step,
            active_copies: tracker.active_count(),
            delivered,
            delivered_total: tracker.deliveries().len(),
            edge_count: view.edge_count(),
        };
        self.observations.push(observation);
        observation
    }

    pub fn observations(&self) -> &[StepObservation] {
        &self.observations
    }

    pub fn last(&self) -> Option<&StepObservation> {
        self.observations.last()
    }

    /// Summarize a trial over `total_messages` generated messages
    pub fn report(
        &self,
        config: &SimConfig,
        total_messages: usize,
        tracker: &MessageTracker,
    ) -> TrialReport {
        let detailed = detailed_metrics(total_messages, tracker);
        let mut delivered_ids: Vec<MessageId> =
            tracker.deliveries().iter().map(|d| d.message).collect();
        delivered_ids.sort_unstable();

        let delivered = delivered_ids.len();
        let fraction_delivered = ratio(delivered as f64, total_messages);
        let metrics = config
            .metrics
            .iter()
            .map(|&metric| MetricValue {
                metric,
                value: metric_value(metric, fraction_delivered, &detailed),
            })
            .collect();

        TrialReport {
            seed: config.seed,
            steps: tracker.stats().steps,
            total_messages,
            delivered,
            fraction_delivered,
            delivered_ids,
            metrics,
            detailed: config.verbose.then_some(detailed),
        }
    }
}

fn metric_value(metric: Metric, fraction_delivered: f64, detailed: &DetailedMetrics) -> f64 {
    match metric {
        Metric::FractionDelivered => fraction_delivered,
        Metric::AverageHops => detailed.average_hops,
        Metric::AverageLatency => detailed.average_latency,
        Metric::MedianLatency => detailed.median_latency,
        Metric::TransmissionsPerMessage => detailed.transmissions_per_message,
        Metric::PeakActiveCopies => detailed.peak_active_copies as f64,
        Metric::MeanNodeLoad => detailed.node_load.mean,
    }
}

fn detailed_metrics(total_messages: usize, tracker: &MessageTracker) -> DetailedMetrics {
    let deliveries = tracker.deliveries();
    let stats = tracker.stats();

    let hops: u64 = deliveries.iter().map(|d| u64::from(d.hops)).sum();
    let mut latencies: Vec<u64> = deliveries.iter().map(|d| d.latency()).collect();
    latencies.sort_unstable();

    DetailedMetrics {
        average_hops: ratio(hops as f64, deliveries.len()),
        average_latency: ratio(latencies.iter().sum::<u64>() as f64, latencies.len()),
        median_latency: median(&latencies),
        total_transmissions: stats.transmissions,
        transmissions_per_message: ratio(stats.transmissions as f64, total_messages),
        peak_active_copies: stats.peak_active,
        stranded_copies: stats.stranded,
        exhausted_copies: stats.exhausted,
        node_load: node_load(tracker.node_load(), stats.steps),
    }
}

fn node_load(load: &[u64], steps: u64) -> NodeLoad {
    if load.is_empty() || steps == 0 {
        return NodeLoad::default();
    }
    let per_step: Vec<f64> = load.iter().map(|&l| l as f64 / steps as f64).collect();
    NodeLoad {
        mean: per_step.iter().sum::<f64>() / per_step.len() as f64,
        min: per_step.iter().copied().fold(f64::INFINITY, f64::min),
        max: per_step.iter().copied().fold(0.0, f64::max),
    }
}

/// `numerator / count`, 0 when `count` is 0
fn ratio(numerator: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        numerator / count as f64
    }
}

/// Median of sorted values, 0 when empty
pub fn median(sorted: &[u64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}
