//! Committee-count vs waiting-time experiments.
//!
//! One experiment builds a topology, binds it to in-memory replicas, submits
//! a random workload and measures how many ticks each transaction takes to
//! become readable. The deployment is torn down on every exit path.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use smartshard_peer::memory::{InMemoryCluster, InMemoryReplica, ReplicaError};
use smartshard_peer::{Deployment, Transaction};
use smartshard_topology::{CommitteeId, TopologyConfig};
use tracing::{debug, info, warn};

use crate::{Error, ExperimentConfig, Result};

/// Value written by every workload transaction.
const TX_VALUE: &str = "999";

/// Raw measurements of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentOutcome {
    /// Committees in the topology
    pub committee_count: u32,
    /// Peers in the topology
    pub peer_count: usize,
    /// Ticks from submission until each transaction was readable
    pub waiting_ticks: Vec<u64>,
    /// Ticks the experiment ran for
    pub elapsed_ticks: u64,
}

/// One averaged row of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Committees in the topology
    pub committee_count: u32,
    /// Mean waiting time across all experiments
    pub avg_waiting_ticks: f64,
    /// Transactions measured
    pub samples: usize,
}

/// Run every committee count in the configured range.
pub fn sweep(config: &ExperimentConfig) -> Result<Vec<DataPoint>> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut points = Vec::new();

    for committee_count in config.min_committees..=config.max_committees {
        info!(committee_count, "Starting experiments");
        let mut waiting = Vec::new();
        for experiment in 0..config.experiments {
            debug!(committee_count, experiment, "Setting up experiment");
            let outcome = run_experiment(config, committee_count, &mut rng)?;
            waiting.extend(outcome.waiting_ticks);
        }

        let point = DataPoint {
            committee_count,
            avg_waiting_ticks: mean(&waiting),
            samples: waiting.len(),
        };
        info!(
            committee_count,
            avg_waiting_ticks = point.avg_waiting_ticks,
            "Experiments ended"
        );
        points.push(point);
    }

    Ok(points)
}

/// Run a single experiment with `committee_count` committees.
pub fn run_experiment(
    config: &ExperimentConfig,
    committee_count: u32,
    rng: &mut impl Rng,
) -> Result<ExperimentOutcome> {
    config.validate()?;
    let topology = TopologyConfig::new(committee_count, config.intersection).generate()?;
    let peer_count = topology.peer_count();

    let mut cluster = InMemoryCluster::default();
    let mut deployment = Deployment::assemble(topology, &mut cluster)?;

    let driven = deployment
        .bootstrap()
        .map_err(Error::from)
        .and_then(|()| drive(config, &mut deployment, &cluster, rng));
    let teardown = deployment.shutdown();

    let (waiting_ticks, elapsed_ticks) = driven?;
    teardown?;

    Ok(ExperimentOutcome {
        committee_count,
        peer_count,
        waiting_ticks,
        elapsed_ticks,
    })
}

/// Submit the workload and poll until every transaction is readable.
///
/// Each tick: poll outstanding transactions, maybe submit one, maybe seal.
fn drive(
    config: &ExperimentConfig,
    deployment: &mut Deployment<InMemoryReplica>,
    cluster: &InMemoryCluster,
    rng: &mut impl Rng,
) -> Result<(Vec<u64>, u64)> {
    let committees: Vec<CommitteeId> = deployment.topology().committees().collect();
    let (interval_lo, interval_hi) = config.submit_interval;

    let mut outstanding: Vec<(u64, Transaction)> = Vec::new();
    let mut waiting = Vec::with_capacity(config.total_tx);
    let mut submitted = 0usize;
    let mut next_submit = rng.gen_range(interval_lo..interval_hi);
    let mut tick = 0u64;

    while waiting.len() < config.total_tx {
        if tick >= config.max_ticks {
            warn!(tick, outstanding = outstanding.len(), "Experiment stalled");
            return Err(Error::Stalled {
                ticks: tick,
                outstanding: outstanding.len() + config.total_tx - submitted,
            });
        }

        let mut still_outstanding = Vec::with_capacity(outstanding.len());
        for (submitted_at, tx) in outstanding {
            if deployment.get(&tx)?.as_deref() == Some(tx.value.as_str()) {
                waiting.push(tick - submitted_at);
            } else {
                still_outstanding.push((submitted_at, tx));
            }
        }
        outstanding = still_outstanding;

        if submitted < config.total_tx && tick >= next_submit {
            let tx = submit_random(deployment, &committees, submitted, rng)?;
            debug!(tick, quorum = %tx.quorum, key = %tx.key, "Submitted transaction");
            outstanding.push((tick, tx));
            submitted += 1;
            next_submit = tick + rng.gen_range(interval_lo..interval_hi);
        }

        if tick % config.block_interval == config.block_interval - 1 {
            cluster.seal();
        }
        tick += 1;
    }

    Ok((waiting, tick))
}

/// Submit one transaction to a random committee through a random member.
fn submit_random(
    deployment: &mut Deployment<InMemoryReplica>,
    committees: &[CommitteeId],
    sequence: usize,
    rng: &mut impl Rng,
) -> Result<Transaction> {
    let quorum = *committees
        .choose(rng)
        .ok_or_else(|| Error::InvalidConfig("topology has no committees".to_owned()))?;
    let members = deployment.members(quorum)?;
    let via = *members
        .choose(rng)
        .ok_or(smartshard_peer::Error::<ReplicaError>::NoLiveMember(quorum))?;

    let tx = Transaction::new(quorum, format!("tx_{sequence}"), TX_VALUE);
    deployment.submit_via(via, &tx)?;
    Ok(tx)
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}
