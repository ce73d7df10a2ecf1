//! Error types for smartshard-sim.

use smartshard_peer::memory::ReplicaError;
use thiserror::Error;

/// Result type for experiment runs.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort an experiment.
#[derive(Debug, Error)]
pub enum Error {
    /// Topology parameters are infeasible.
    #[error("topology error: {0}")]
    Topology(#[from] smartshard_topology::Error),

    /// A peer or replica call failed.
    #[error("peer error: {0}")]
    Peer(#[from] smartshard_peer::Error<ReplicaError>),

    /// Experiment configuration is invalid.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Transactions never became readable.
    #[error("experiment stalled after {ticks} ticks with {outstanding} transactions outstanding")]
    Stalled { ticks: u64, outstanding: usize },

    /// Config file could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
