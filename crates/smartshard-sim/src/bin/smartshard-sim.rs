//! SmartShard Experiment Runner
//!
//! Sweeps committee counts and writes average waiting time per count as CSV.

use std::path::PathBuf;

use clap::Parser;
use smartshard_logging::LogConfig;
use smartshard_sim::{sweep, write_csv_file, ExperimentConfig};

/// Committee count vs waiting time over in-memory SmartShard deployments
#[derive(Parser, Debug)]
#[command(name = "smartshard-sim")]
#[command(about = "Make a waiting-time graph: one data point per committee count", long_about = None)]
struct Args {
    /// File to output data (csv format)
    #[arg(short = 'o', long, default_value = "smartshard-waiting-time.csv")]
    output: PathBuf,

    /// JSON experiment config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Starting number of committees
    #[arg(long)]
    min: Option<u32>,

    /// Final number of committees
    #[arg(long)]
    max: Option<u32>,

    /// Intersection between committees
    #[arg(short = 'i', long)]
    intersection: Option<usize>,

    /// Number of experiments per data point
    #[arg(short = 'e', long)]
    experiments: Option<usize>,

    /// Transactions submitted per experiment
    #[arg(short = 't', long)]
    total_tx: Option<usize>,

    /// Workload seed
    #[arg(long)]
    seed: Option<u64>,

    /// Also log to this file (rotated at 5 MiB)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log to the console as well as the log file
    #[arg(long)]
    console: bool,
}

impl Args {
    fn experiment_config(&self) -> smartshard_sim::Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None => ExperimentConfig::default(),
        };

        if let Some(min) = self.min {
            config.min_committees = min;
        }
        if let Some(max) = self.max {
            config.max_committees = max;
        }
        // A lone --min sweeps just that count.
        if config.max_committees < config.min_committees {
            config.max_committees = config.min_committees;
        }
        if let Some(intersection) = self.intersection {
            config.intersection = intersection;
        }
        if let Some(experiments) = self.experiments {
            config.experiments = experiments;
        }
        if let Some(total_tx) = self.total_tx {
            config.total_tx = total_tx;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        config.validate()?;
        Ok(config)
    }

    fn log_config(&self) -> LogConfig {
        match &self.log_file {
            Some(path) => LogConfig::default()
                .with_file(path)
                .with_console(self.console),
            None => LogConfig::default(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    smartshard_logging::init(&args.log_config())?;

    let config = args.experiment_config()?;

    println!("SmartShard Waiting-Time Experiments");
    println!("===================================");
    println!();
    println!(
        "Committees {}..={}, intersection {}, {} experiments x {} transactions",
        config.min_committees,
        config.max_committees,
        config.intersection,
        config.experiments,
        config.total_tx
    );
    println!("Outputting to {}", args.output.display());
    println!();

    let points = sweep(&config)?;
    write_csv_file(&args.output, &points)?;

    for point in &points {
        println!(
            "  {:>4} committees: {:.2} ticks avg over {} transactions",
            point.committee_count, point.avg_waiting_ticks, point.samples
        );
    }

    Ok(())
}
