//! Experiment configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use smartshard_topology::MIN_COMMITTEES;

use crate::{Error, Result};

/// Parameters of a committee-count sweep.
///
/// All times are logical ticks. The in-memory cluster seals one block per
/// committee every `block_interval` ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Smallest committee count in the sweep
    pub min_committees: u32,
    /// Largest committee count in the sweep
    pub max_committees: u32,
    /// Peers shared by every pair of committees
    pub intersection: usize,
    /// Experiments averaged per data point
    pub experiments: usize,
    /// Transactions submitted per experiment
    pub total_tx: usize,
    /// Ticks between submissions, drawn from `[min, max)`
    pub submit_interval: (u64, u64),
    /// Ticks between sealed blocks
    pub block_interval: u64,
    /// Abort an experiment that runs longer than this
    pub max_ticks: u64,
    /// Workload seed
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            min_committees: 10,
            max_committees: 10,
            intersection: 1,
            experiments: 10,
            total_tx: 100,
            submit_interval: (2, 31),
            block_interval: 5,
            max_ticks: 1_000_000,
            seed: 42,
        }
    }
}

impl ExperimentConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Sweep committee counts from `min` to `max` inclusive.
    #[must_use]
    pub fn with_committees(mut self, min: u32, max: u32) -> Self {
        self.min_committees = min;
        self.max_committees = max;
        self
    }

    /// Set the intersection size.
    #[must_use]
    pub fn with_intersection(mut self, intersection: usize) -> Self {
        self.intersection = intersection;
        self
    }

    /// Set experiments per data point.
    #[must_use]
    pub fn with_experiments(mut self, experiments: usize) -> Self {
        self.experiments = experiments;
        self
    }

    /// Set transactions per experiment.
    #[must_use]
    pub fn with_total_tx(mut self, total_tx: usize) -> Self {
        self.total_tx = total_tx;
        self
    }

    /// Set the submission interval range in ticks.
    #[must_use]
    pub fn with_submit_interval(mut self, min: u64, max: u64) -> Self {
        self.submit_interval = (min, max);
        self
    }

    /// Set the block interval in ticks.
    #[must_use]
    pub fn with_block_interval(mut self, ticks: u64) -> Self {
        self.block_interval = ticks;
        self
    }

    /// Set the workload seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidConfig(msg.to_owned()));

        if self.min_committees < MIN_COMMITTEES {
            return invalid("min_committees must be at least 2");
        }
        if self.max_committees < self.min_committees {
            return invalid("max_committees must not be below min_committees");
        }
        if self.intersection == 0 {
            return invalid("intersection must be at least 1");
        }
        if self.experiments == 0 || self.total_tx == 0 {
            return invalid("experiments and total_tx must be positive");
        }
        let (lo, hi) = self.submit_interval;
        if lo == 0 || hi <= lo {
            return invalid("submit_interval must be a non-empty range of positive ticks");
        }
        if self.block_interval == 0 {
            return invalid("block_interval must be positive");
        }
        Ok(())
    }
}
