//! SmartShard Committee Topology
//!
//! Assigns peers to pairs of committees so that every pair of committees
//! shares exactly `k` peers.
//!
//! # Mathematical Foundation
//!
//! With `N` committees and intersection size `k`:
//! - There are `N(N-1)/2` unordered committee pairs
//! - Each pair receives `k` dedicated bridge peers
//! - Total peers: `N(N-1)k/2`
//! - Each committee sits in `N-1` pairs, so its size is `(N-1)k`
//!
//! Every peer belongs to exactly two committees. A peer is the only thing two
//! otherwise independent consensus groups have in common.
//!
//! # Example
//!
//! ```
//! use smartshard_topology::{CommitteeId, CommitteeTopology};
//!
//! let topology = CommitteeTopology::generate(5, 1).unwrap();
//! assert_eq!(topology.peer_count(), 10);
//! assert_eq!(topology.members(CommitteeId(0)).unwrap().len(), 4);
//! ```

mod committee;
mod error;
mod pairs;
mod topology;

pub use committee::{CommitteeId, CommitteePair, PeerIndex};
pub use error::{Error, Result};
pub use pairs::{expected_committee_size, expected_peer_count, pair_count, CommitteePairs};
pub use topology::{CommitteeTopology, PeerAssignment, Topology, TopologyConfig};

/// Smallest committee count that has any pairwise structure.
pub const MIN_COMMITTEES: u32 = 2;

/// Smallest useful intersection size.
pub const MIN_INTERSECTION: usize = 1;

/// Committees a single peer belongs to (invariant: always 2).
pub const COMMITTEES_PER_PEER: usize = 2;
