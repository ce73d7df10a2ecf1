//! Topology generation and invariant checks.
//!
//! A [`Topology`] is immutable once generated. Peers joining or leaving a
//! running committee are handled by reconfiguring replicas, never by
//! regenerating the topology.

use std::collections::HashMap;

use crate::{
    expected_committee_size, expected_peer_count, CommitteeId, CommitteePair, CommitteePairs,
    Error, PeerIndex, Result, MIN_COMMITTEES, MIN_INTERSECTION,
};

/// Parameters for topology generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopologyConfig {
    /// Number of committees `N`
    pub committee_count: u32,
    /// Peers shared by every pair of committees `k`
    pub intersection: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            committee_count: 5,
            intersection: 1,
        }
    }
}

impl TopologyConfig {
    /// Create a config.
    pub const fn new(committee_count: u32, intersection: usize) -> Self {
        Self {
            committee_count,
            intersection,
        }
    }

    /// Set the committee count.
    #[must_use]
    pub fn with_committee_count(mut self, committee_count: u32) -> Self {
        self.committee_count = committee_count;
        self
    }

    /// Set the intersection size.
    #[must_use]
    pub fn with_intersection(mut self, intersection: usize) -> Self {
        self.intersection = intersection;
        self
    }

    /// Check that the parameters form a pairwise design.
    ///
    /// Returns the total peer count on success.
    pub fn validate(&self) -> Result<usize> {
        let infeasible = |reason| Error::Infeasible {
            committee_count: self.committee_count,
            intersection: self.intersection,
            reason,
        };

        if self.committee_count < MIN_COMMITTEES {
            return Err(infeasible("at least two committees are required"));
        }
        if self.intersection < MIN_INTERSECTION {
            return Err(infeasible("intersection must be at least one peer"));
        }
        let peer_count = expected_peer_count(self.committee_count, self.intersection)
            .ok_or_else(|| infeasible("peer count overflows"))?;

        let bytes = peer_count.checked_mul(std::mem::size_of::<PeerAssignment>());
        if !bytes.is_some_and(|bytes| bytes <= isize::MAX as usize) {
            return Err(infeasible("peer count too large to allocate"));
        }
        Ok(peer_count)
    }

    /// Generate the topology described by this config.
    pub fn generate(&self) -> Result<Topology> {
        CommitteeTopology::generate(self.committee_count, self.intersection)
    }
}

/// One peer's place in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerAssignment {
    /// Position in generation order
    pub index: PeerIndex,
    /// The two committees this peer bridges
    pub pair: CommitteePair,
}

/// Pairwise-intersection committee generator.
pub struct CommitteeTopology;

impl CommitteeTopology {
    /// Generate the full peer assignment for `committee_count` committees
    /// sharing `intersection` peers pairwise.
    ///
    /// Pairs are visited lexicographically and each receives `intersection`
    /// consecutive peer indices, so the result is fully deterministic.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartshard_topology::{CommitteeId, CommitteeTopology};
    ///
    /// let topology = CommitteeTopology::generate(3, 5).unwrap();
    /// assert_eq!(topology.peer_count(), 15);
    /// assert_eq!(topology.committee_size(), 10);
    ///
    /// assert!(CommitteeTopology::generate(1, 5).is_err());
    /// assert!(CommitteeTopology::generate(3, 0).is_err());
    /// ```
    pub fn generate(committee_count: u32, intersection: usize) -> Result<Topology> {
        let config = TopologyConfig::new(committee_count, intersection);
        let peer_count = config.validate()?;

        let mut peers = Vec::new();
        peers
            .try_reserve_exact(peer_count)
            .map_err(|_| Error::Infeasible {
                committee_count,
                intersection,
                reason: "peer count too large to allocate",
            })?;
        for pair in CommitteePairs::new(committee_count) {
            for _ in 0..intersection {
                peers.push(PeerAssignment {
                    index: PeerIndex(peers.len()),
                    pair,
                });
            }
        }

        Ok(Topology { config, peers })
    }
}

/// A complete peer-to-committee-pair assignment.
///
/// Deserialization re-checks every invariant, so a decoded topology is as
/// trustworthy as a generated one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "UncheckedTopology"))]
pub struct Topology {
    config: TopologyConfig,
    peers: Vec<PeerAssignment>,
}

/// Wire form of a [`Topology`] before verification.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct UncheckedTopology {
    config: TopologyConfig,
    peers: Vec<PeerAssignment>,
}

#[cfg(feature = "serde")]
impl TryFrom<UncheckedTopology> for Topology {
    type Error = Error;

    fn try_from(raw: UncheckedTopology) -> Result<Self> {
        let peer_count = raw.config.validate()?;
        if raw.peers.len() != peer_count {
            return Err(Error::InvariantViolated(format!(
                "{} peers listed, expected {}",
                raw.peers.len(),
                peer_count
            )));
        }

        let topology = Topology {
            config: raw.config,
            peers: raw.peers,
        };
        topology.verify()?;
        Ok(topology)
    }
}

impl Topology {
    /// Number of committees `N`.
    pub fn committee_count(&self) -> u32 {
        self.config.committee_count
    }

    /// Pairwise intersection size `k`.
    pub fn intersection(&self) -> usize {
        self.config.intersection
    }

    /// The generation parameters.
    pub fn config(&self) -> TopologyConfig {
        self.config
    }

    /// Total number of peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// All peers in generation order.
    pub fn peers(&self) -> &[PeerAssignment] {
        &self.peers
    }

    /// Look up a peer by index.
    pub fn peer(&self, index: PeerIndex) -> Option<&PeerAssignment> {
        self.peers.get(index.0)
    }

    /// All committee ids `0..N`.
    pub fn committees(&self) -> impl Iterator<Item = CommitteeId> {
        (0..self.config.committee_count).map(CommitteeId)
    }

    /// Whether a committee id is inside `[0, N)`.
    pub fn contains_committee(&self, committee: CommitteeId) -> bool {
        committee.0 < self.config.committee_count
    }

    /// Size every committee has: `(N-1)k`.
    pub fn committee_size(&self) -> usize {
        // validate() already ruled out overflow of the larger peer count
        expected_committee_size(self.config.committee_count, self.config.intersection)
            .unwrap_or_default()
    }

    /// Peers belonging to a committee, ascending.
    pub fn members(&self, committee: CommitteeId) -> Result<Vec<PeerIndex>> {
        self.check_committee(committee)?;
        Ok(self
            .peers
            .iter()
            .filter(|p| p.pair.contains(committee))
            .map(|p| p.index)
            .collect())
    }

    /// Bridge peers shared by two committees, ascending.
    pub fn shared_by(&self, a: CommitteeId, b: CommitteeId) -> Result<Vec<PeerIndex>> {
        self.check_committee(a)?;
        self.check_committee(b)?;
        Ok(self
            .peers
            .iter()
            .filter(|p| p.pair.contains(a) && p.pair.contains(b))
            .map(|p| p.index)
            .collect())
    }

    /// Re-check every structural invariant.
    ///
    /// - every committee id is in `[0, N)`
    /// - the two committees of a peer differ
    /// - every unordered pair is shared by exactly `k` peers
    /// - every committee has `(N-1)k` members
    pub fn verify(&self) -> Result<()> {
        let n = self.config.committee_count;
        let k = self.config.intersection;

        let mut per_pair: HashMap<(CommitteeId, CommitteeId), usize> = HashMap::new();
        let mut per_committee: HashMap<CommitteeId, usize> = HashMap::new();

        for (position, peer) in self.peers.iter().enumerate() {
            if peer.index.0 != position {
                return Err(Error::InvariantViolated(format!(
                    "peer at position {} carries index {}",
                    position, peer.index
                )));
            }
            let CommitteePair { a, b } = peer.pair;
            for id in [a, b] {
                if id.0 >= n {
                    return Err(Error::InvariantViolated(format!(
                        "peer {} references committee {} outside [0, {})",
                        peer.index, id, n
                    )));
                }
            }
            if a == b {
                return Err(Error::InvariantViolated(format!(
                    "peer {} is assigned twice to committee {}",
                    peer.index, a
                )));
            }

            let key = peer.pair.normalized();
            *per_pair.entry((key.a, key.b)).or_default() += 1;
            *per_committee.entry(a).or_default() += 1;
            *per_committee.entry(b).or_default() += 1;
        }

        for pair in CommitteePairs::new(n) {
            let shared = per_pair.get(&(pair.a, pair.b)).copied().unwrap_or(0);
            if shared != k {
                return Err(Error::InvariantViolated(format!(
                    "committees {} share {} peers, expected {}",
                    pair, shared, k
                )));
            }
        }

        let size = self.committee_size();
        for committee in self.committees() {
            let members = per_committee.get(&committee).copied().unwrap_or(0);
            if members != size {
                return Err(Error::InvariantViolated(format!(
                    "committee {} has {} members, expected {}",
                    committee, members, size
                )));
            }
        }

        Ok(())
    }

    fn check_committee(&self, committee: CommitteeId) -> Result<()> {
        if self.contains_committee(committee) {
            Ok(())
        } else {
            Err(Error::UnknownCommittee {
                committee,
                committee_count: self.config.committee_count,
            })
        }
    }
}
