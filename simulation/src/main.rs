//! churn-sim: routing over dynamic topologies
//!
//! Runs a single trial, a heatmap sweep or one of the built-in scenarios and
//! prints the resulting metrics.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use rand::Rng;
use tracing::info;

use churn_logging::{FileConfig, LogConfig, RotationStrategy, SubscriberBuilder, WorkerGuard};
use churn_simulation::{
    Algorithm, HeatmapGrid, HeatmapSpec, JsonFrameWriter, Metric, Scenario, SimConfig, Simulation,
    SweepAxis, SweepParameter, TopologyKind, TrialReport, Ttl, frame_prefix, run_heatmap,
    run_scenario,
};

#[derive(Parser)]
#[command(
    name = "churn-sim",
    about = "Message routing simulation over dynamic topologies",
    version
)]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of nodes
    #[arg(long)]
    num_nodes: Option<usize>,

    /// Number of messages in the workload
    #[arg(long)]
    num_messages: Option<usize>,

    /// Number of steps to run
    #[arg(long)]
    num_steps: Option<u64>,

    /// Initial hop budget per message (unbounded when absent)
    #[arg(long, allow_negative_numbers = true)]
    ttl: Option<i64>,

    /// Expected connectivity in [0, 1]
    #[arg(long)]
    density: Option<f64>,

    /// Rate of topology change per step in [0, 1]
    #[arg(long)]
    volatility: Option<f64>,

    /// Topology family: random, geo
    #[arg(long)]
    topology: Option<TopologyKind>,

    /// Routing algorithm: random, bfs, bfs-ttl, bfs-ttl-early-split,
    /// bfs-ttl-late-split, bfs-loops
    #[arg(long)]
    alg: Option<Algorithm>,

    /// Metrics to report, comma separated
    #[arg(long = "metric", value_delimiter = ',')]
    metrics: Vec<Metric>,

    /// Write one JSON frame per step for rendering
    #[arg(long)]
    graphics: bool,

    /// Run a heatmap sweep instead of a single trial
    #[arg(long)]
    heatmap: bool,

    /// Report detailed metrics and log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Seed for every random stream (drawn from OS entropy when absent)
    #[arg(long)]
    seed: Option<u64>,

    /// Trials per heatmap cell
    #[arg(long, default_value_t = 10)]
    trials: usize,

    /// Parameter swept along heatmap rows
    #[arg(long, default_value = "density")]
    sweep_rows: SweepParameter,

    /// Parameter swept along heatmap columns
    #[arg(long, default_value = "volatility")]
    sweep_cols: SweepParameter,

    /// Row values, comma separated (defaults per parameter)
    #[arg(long, value_delimiter = ',')]
    row_values: Vec<f64>,

    /// Column values, comma separated (defaults per parameter)
    #[arg(long, value_delimiter = ',')]
    col_values: Vec<f64>,

    /// Worker threads for heatmap sweeps
    #[arg(long)]
    workers: Option<usize>,

    /// Directory frames are written under
    #[arg(long, default_value = "frames")]
    frames_dir: PathBuf,

    /// Run a built-in scenario instead
    #[arg(long, value_enum)]
    scenario: Option<Scenario>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Log to the console as JSONL
    #[arg(long)]
    log_json: bool,

    /// Also write JSONL logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);

    if let Some(scenario) = cli.scenario {
        let report = run_scenario(scenario)?;
        return print_report(&report, cli.json);
    }

    let config = build_config(&cli)?;
    if config.heatmap {
        run_sweep(&cli, config)
    } else {
        run_single(&cli, config)
    }
}

fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let config = if cli.verbose {
        LogConfig::development()
    } else if cli.heatmap {
        // Sweeps log errors only
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    let mut builder = SubscriberBuilder::new()
        .with_config(config)
        .with_json_console(cli.log_json);
    if let Some(dir) = &cli.log_dir {
        builder = builder.with_file_output(FileConfig {
            directory: dir.clone(),
            prefix: "churn-sim".to_string(),
            rotation: RotationStrategy::Never,
        });
    }
    builder.init()
}

fn load_config(path: &Path) -> anyhow::Result<SimConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Merge the config file (if any) with command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };

    if let Some(num_nodes) = cli.num_nodes {
        config.num_nodes = num_nodes;
    }
    if let Some(num_messages) = cli.num_messages {
        config.num_messages = num_messages;
    }
    if let Some(num_steps) = cli.num_steps {
        config.num_steps = num_steps;
    }
    if let Some(ttl) = cli.ttl {
        config.ttl = Ttl::try_from(Some(ttl))?;
    }
    if let Some(density) = cli.density {
        config.density = density;
    }
    if let Some(volatility) = cli.volatility {
        config.volatility = volatility;
    }
    if let Some(topology) = cli.topology {
        config.topology = topology;
    }
    if let Some(alg) = cli.alg {
        config.alg = alg;
    }
    if !cli.metrics.is_empty() {
        config.metrics = cli.metrics.clone();
    }
    config.graphics |= cli.graphics;
    config.heatmap |= cli.heatmap;
    config.verbose |= cli.verbose;

    match cli.seed {
        Some(seed) => config.seed = seed,
        // A config file carries its own seed
        None if cli.config.is_none() => {
            config.seed = rand::rng().random();
            info!("No seed given, using {}", config.seed);
        }
        None => {}
    }

    config.validate()?;
    Ok(config)
}

fn run_single(cli: &Cli, config: SimConfig) -> anyhow::Result<()> {
    let mut sim = Simulation::new(config.clone())?;
    let report = if config.graphics {
        let prefix = frame_prefix(
            config.topology,
            config.num_nodes,
            config.density,
            config.volatility,
        );
        let mut writer = JsonFrameWriter::new(&cli.frames_dir, prefix)?;
        let report = sim.run_with_sink(&mut writer)?;
        info!(
            "Wrote {} frames to {}",
            writer.written(),
            writer.dir().display()
        );
        report
    } else {
        sim.run()?
    };
    print_report(&report, cli.json)
}

fn sweep_axis(parameter: SweepParameter, values: &[f64]) -> anyhow::Result<SweepAxis> {
    if values.is_empty() {
        Ok(SweepAxis::default_for(parameter))
    } else {
        Ok(SweepAxis::new(parameter, values.to_vec())?)
    }
}

fn run_sweep(cli: &Cli, config: SimConfig) -> anyhow::Result<()> {
    let rows = sweep_axis(cli.sweep_rows, &cli.row_values)?;
    let columns = sweep_axis(cli.sweep_cols, &cli.col_values)?;
    let mut spec = HeatmapSpec::new(config, rows, columns).with_trials(cli.trials);
    if let Some(workers) = cli.workers {
        spec = spec.with_workers(workers);
    }

    let grids = run_heatmap(&spec)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&grids)?);
    } else {
        grids.iter().for_each(print_grid);
    }
    Ok(())
}

fn print_grid(grid: &HeatmapGrid) {
    println!("{}", grid);
}

fn print_report(report: &TrialReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("seed:        {}", report.seed);
    println!("steps:       {}", report.steps);
    println!(
        "delivered:   {}/{} ({:.2}%)",
        report.delivered,
        report.total_messages,
        report.fraction_delivered * 100.0
    );
    for value in &report.metrics {
        println!("{:<26} {:.4}", value.metric.name(), value.value);
    }
    if let Some(detailed) = &report.detailed {
        println!();
        println!("average hops:              {:.3}", detailed.average_hops);
        println!("average latency:           {:.3}", detailed.average_latency);
        println!("median latency:            {:.1}", detailed.median_latency);
        println!("transmissions:             {}", detailed.total_transmissions);
        println!(
            "transmissions per message: {:.3}",
            detailed.transmissions_per_message
        );
        println!("peak active copies:        {}", detailed.peak_active_copies);
        println!("stranded copies:           {}", detailed.stranded_copies);
        println!("exhausted copies:          {}", detailed.exhausted_copies);
        println!(
            "node load (mean/min/max):  {:.3} / {:.3} / {:.3}",
            detailed.node_load.mean, detailed.node_load.min, detailed.node_load.max
        );
    }
    Ok(())
}
