//! SmartShard Experiments
//!
//! Measures how transaction waiting time changes with the number of
//! committees in an overlapping shard topology.
//!
//! # Architecture
//!
//! - **Config**: sweep range, workload shape and seed ([`ExperimentConfig`])
//! - **Experiment**: one topology bound to in-memory replicas, driven by a
//!   random workload in logical ticks ([`run_experiment`])
//! - **Sweep**: averages experiments per committee count ([`sweep`])
//! - **Report**: CSV output ([`write_csv`])
//!
//! # Usage
//!
//! ```no_run
//! use smartshard_sim::{sweep, write_csv_file, ExperimentConfig};
//!
//! let config = ExperimentConfig::default().with_committees(5, 8);
//! let points = sweep(&config).unwrap();
//! write_csv_file("results.csv", &points).unwrap();
//! ```

mod config;
mod error;
mod experiment;
mod report;

pub use config::ExperimentConfig;
pub use error::{Error, Result};
pub use experiment::{run_experiment, sweep, DataPoint, ExperimentOutcome};
pub use report::{write_csv, write_csv_file, CSV_HEADER};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_then_report() {
        let config = ExperimentConfig::default()
            .with_committees(2, 3)
            .with_experiments(1)
            .with_total_tx(5)
            .with_submit_interval(1, 3);

        let points = sweep(&config).unwrap();
        let mut out = Vec::new();
        write_csv(&mut out, &points).unwrap();

        let text = String::from_utf8(out).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], CSV_HEADER);
        assert!(rows[1].starts_with("2, "));
        assert!(rows[2].starts_with("3, "));
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let config = ExperimentConfig::default().with_committees(1, 3);
        assert!(matches!(sweep(&config), Err(Error::InvalidConfig(_))));
    }
}
