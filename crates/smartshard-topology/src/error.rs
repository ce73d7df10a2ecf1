//! Error types for smartshard-topology.

use thiserror::Error;

use crate::CommitteeId;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or querying a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested committee count and intersection cannot form a pairwise design.
    #[error("infeasible topology ({committee_count} committees, intersection {intersection}): {reason}")]
    Infeasible {
        committee_count: u32,
        intersection: usize,
        reason: &'static str,
    },

    /// A committee id outside `[0, N)` was queried.
    #[error("unknown committee {committee} (topology has {committee_count} committees)")]
    UnknownCommittee {
        committee: CommitteeId,
        committee_count: u32,
    },

    /// A topology failed verification.
    #[error("topology invariant violated: {0}")]
    InvariantViolated(String),
}
