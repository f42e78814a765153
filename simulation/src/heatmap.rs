//! Multi-trial parameter sweeps
//!
//! A heatmap runs `trials` independent trials for every (row, column) cell
//! of a two-parameter grid and reduces each cell to the mean of every
//! selected metric. Cells run in parallel on a dedicated rayon pool; the
//! trials of one cell are summed by a single task in trial order, so a grid
//! does not depend on the number of workers.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use churn_core::{ConfigError, Metric, SimConfig, SimError, SimResult, SweepParameter};

use crate::rng;
use crate::simulation::run_trial;

/// Values swept by default on density and volatility axes
pub const DEFAULT_SWEEP_VALUES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Values swept by default on a ttl axis
const DEFAULT_TTL_VALUES: [f64; 5] = [1.0, 2.0, 4.0, 8.0, 16.0];

/// One axis of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepAxis {
    pub parameter: SweepParameter,
    pub values: Vec<f64>,
}

impl SweepAxis {
    /// Create an axis, checking every value
    pub fn new(parameter: SweepParameter, values: Vec<f64>) -> Result<Self, ConfigError> {
        let axis = Self { parameter, values };
        axis.validate()?;
        Ok(axis)
    }

    /// Default values for `parameter`
    pub fn default_for(parameter: SweepParameter) -> Self {
        let values = match parameter {
            SweepParameter::Ttl => DEFAULT_TTL_VALUES.to_vec(),
            SweepParameter::Density | SweepParameter::Volatility => DEFAULT_SWEEP_VALUES.to_vec(),
        };
        Self { parameter, values }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.values.is_empty() {
            return Err(ConfigError::EmptySweepAxis(self.parameter.name().to_string()));
        }
        self.values
            .iter()
            .try_for_each(|&value| self.parameter.check(value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Description of a heatmap sweep
#[derive(Debug, Clone)]
pub struct HeatmapSpec {
    /// Configuration every trial starts from
    pub base: SimConfig,
    pub rows: SweepAxis,
    pub columns: SweepAxis,
    /// Trials per cell
    pub trials: usize,
    /// Worker threads
    pub workers: usize,
}

impl HeatmapSpec {
    pub fn new(base: SimConfig, rows: SweepAxis, columns: SweepAxis) -> Self {
        let workers = rayon::current_num_threads();
        Self {
            base,
            rows,
            columns,
            trials: 10,
            workers,
        }
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base.validate()?;
        self.rows.validate()?;
        self.columns.validate()?;
        if self.trials == 0 {
            return Err(ConfigError::NonPositive("trials"));
        }
        Ok(())
    }

    /// Configuration of one trial of cell (`row`, `column`)
    pub fn trial_config(&self, row: usize, column: usize, trial: usize) -> SimConfig {
        let row_value = self.rows.values[row];
        let column_value = self.columns.values[column];
        let config = self.columns.parameter.apply(
            &self.rows.parameter.apply(&self.base, row_value),
            column_value,
        );
        SimConfig {
            graphics: false,
            heatmap: false,
            verbose: false,
            ..config
        }
        .with_seed(trial_seed(self.base.seed, row_value, column_value, trial))
    }
}

/// Seed of one trial, a pure function of its cell coordinates and index
pub fn trial_seed(base: u64, row_value: f64, column_value: f64, trial: usize) -> u64 {
    rng::mix_seed(base, &[row_value.to_bits(), column_value.to_bits(), trial as u64])
}

/// Partial sum of a cell's metric values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CellAccumulator {
    pub sum: f64,
    pub count: u64,
}

impl CellAccumulator {
    pub fn record(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Mean of the recorded values, 0 when empty
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Cell means of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapGrid {
    pub metric: Metric,
    pub row_parameter: SweepParameter,
    pub column_parameter: SweepParameter,
    pub row_values: Vec<f64>,
    pub column_values: Vec<f64>,
    /// `cells[row][column]`
    pub cells: Vec<Vec<f64>>,
}

impl HeatmapGrid {
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.cells.get(row).and_then(|r| r.get(column)).copied()
    }
}

impl fmt::Display for HeatmapGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({} rows x {} columns)",
            self.metric, self.row_parameter, self.column_parameter
        )?;
        write!(f, "{:>12}", "")?;
        for value in &self.column_values {
            write!(f, " {:>8}", value)?;
        }
        writeln!(f)?;
        for (value, row) in self.row_values.iter().zip(&self.cells) {
            write!(f, "{:>12}", value)?;
            for cell in row {
                write!(f, " {:>8.3}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Run every trial of `spec` and return one grid per selected metric
pub fn run_heatmap(spec: &HeatmapSpec) -> SimResult<Vec<HeatmapGrid>> {
    spec.validate()?;
    let cells = spec.rows.len() * spec.columns.len();
    let workers = spec.workers.clamp(1, cells);
    info!(
        "Heatmap sweep: {} x {} over {} x {} values, {} trials per cell, {} workers",
        spec.rows.parameter,
        spec.columns.parameter,
        spec.rows.len(),
        spec.columns.len(),
        spec.trials,
        workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("sweep-{}", i))
        .build()
        .map_err(|e| SimError::ThreadPool(e.to_string()))?;

    // Indexed [cell][metric]
    let results: Vec<Vec<CellAccumulator>> = pool.install(|| {
        (0..cells)
            .into_par_iter()
            .map(|cell| run_cell(spec, cell))
            .collect::<SimResult<Vec<_>>>()
    })?;

    let columns = spec.columns.len();
    let grids = spec
        .base
        .metrics
        .iter()
        .enumerate()
        .map(|(m, &metric)| HeatmapGrid {
            metric,
            row_parameter: spec.rows.parameter,
            column_parameter: spec.columns.parameter,
            row_values: spec.rows.values.clone(),
            column_values: spec.columns.values.clone(),
            cells: results
                .chunks(columns)
                .map(|row| row.iter().map(|cell| cell[m].mean()).collect())
                .collect(),
        })
        .collect();
    info!("Heatmap sweep complete: {} cells", cells);
    Ok(grids)
}

/// Run every trial of one cell, returning an accumulator per selected metric
fn run_cell(spec: &HeatmapSpec, cell: usize) -> SimResult<Vec<CellAccumulator>> {
    let columns = spec.columns.len();
    let (row, column) = (cell / columns, cell % columns);
    let metrics = &spec.base.metrics;
    let mut accumulators = vec![CellAccumulator::default(); metrics.len()];

    for trial in 0..spec.trials {
        let report = run_trial(&spec.trial_config(row, column, trial))?;
        for (accumulator, &metric) in accumulators.iter_mut().zip(metrics) {
            if let Some(value) = report.metric(metric) {
                accumulator.record(value);
            }
        }
    }
    debug!(
        "Cell ({}, {}) done: {}={}, {}={}",
        row,
        column,
        spec.rows.parameter,
        spec.rows.values[row],
        spec.columns.parameter,
        spec.columns.values[column]
    );
    Ok(accumulators)
}
