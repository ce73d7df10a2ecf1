//! Error types for smartshard-peer.

use smartshard_topology::{CommitteeId, CommitteePair, PeerIndex};
use thiserror::Error;

/// Result type for peer operations, generic over the replica error `E`.
pub type Result<T, E> = std::result::Result<T, Error<E>>;

/// Errors that can occur while routing to or managing replicas.
///
/// Replica failures are carried unchanged in [`Error::Replica`].
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: std::error::Error + 'static,
{
    /// The operation addressed a committee this peer does not serve.
    #[error("unknown quorum {requested}, known quorums {known}")]
    UnknownQuorum {
        known: CommitteePair,
        requested: CommitteeId,
    },

    /// Both replicas of a peer were bound to the same committee.
    #[error("peer cannot serve committee {0} with both replicas")]
    DuplicateCommittee(CommitteeId),

    /// The underlying replica failed.
    #[error("replica error: {0}")]
    Replica(#[source] E),

    /// Topology construction or lookup failed.
    #[error(transparent)]
    Topology(#[from] smartshard_topology::Error),

    /// No live peer exists at this index.
    #[error("no live peer {0}")]
    UnknownPeer(PeerIndex),

    /// Every member of a committee has departed.
    #[error("committee {0} has no live member")]
    NoLiveMember(CommitteeId),
}

impl<E> Error<E>
where
    E: std::error::Error + 'static,
{
    /// Whether this is the unknown-quorum routing condition.
    pub fn is_unknown_quorum(&self) -> bool {
        matches!(self, Self::UnknownQuorum { .. })
    }
}
