//! A topology bound to live replicas.
//!
//! [`Deployment::assemble`] turns every [`PeerAssignment`] into a
//! [`DualMembershipPeer`] backed by two freshly acquired replicas. Setup is
//! all-or-nothing: if any acquisition fails, everything acquired so far is
//! released before the error is returned.
//!
//! The topology itself never changes. A departing peer is shut down and the
//! surviving members of its two committees are reconfigured through
//! `update_membership`.

use std::net::IpAddr;

use smartshard_topology::{CommitteeId, PeerAssignment, PeerIndex, Topology};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::peer::DualMembershipPeer;
use crate::replica::{ReplicaFactory, ReplicaHandle};
use crate::transaction::Transaction;

/// Keys and addresses of a committee's live members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Member indices, ascending
    pub members: Vec<PeerIndex>,
    /// Validator keys, in member order
    pub validator_keys: Vec<String>,
    /// User keys, in member order
    pub user_keys: Vec<String>,
    /// Replica addresses, in member order
    pub ips: Vec<IpAddr>,
}

/// Every peer of a topology, bound to replicas.
pub struct Deployment<H: ReplicaHandle> {
    topology: Topology,
    /// Indexed by `PeerIndex`; `None` once a peer departed.
    peers: Vec<Option<DualMembershipPeer<H>>>,
}

impl<H: ReplicaHandle> Deployment<H> {
    /// Acquire two replicas per assignment and bind them into peers.
    pub fn assemble<F>(topology: Topology, factory: &mut F) -> Result<Self, H::Error>
    where
        F: ReplicaFactory<Replica = H>,
    {
        let mut peers = Vec::with_capacity(topology.peer_count());

        for assignment in topology.peers() {
            match build_peer(assignment, factory) {
                Ok(peer) => peers.push(Some(peer)),
                Err(e) => {
                    error!(peer = %assignment.index, error = %e, "Deployment setup failed, releasing peers");
                    release_peers(peers.into_iter().flatten());
                    return Err(e);
                }
            }
        }

        info!(
            committees = topology.committee_count(),
            intersection = topology.intersection(),
            peers = peers.len(),
            "Assembled deployment"
        );
        Ok(Self { topology, peers })
    }

    /// Create genesis and join the network of every committee.
    ///
    /// Genesis goes to the lowest-index member; every member then joins with
    /// the full address list of the committee.
    pub fn bootstrap(&mut self) -> Result<(), H::Error> {
        let committees: Vec<CommitteeId> = self.topology.committees().collect();
        for committee in committees {
            let roster = self.roster(committee)?;
            let first = *roster
                .members
                .first()
                .ok_or(Error::NoLiveMember(committee))?;

            self.live_peer_mut(first)?.make_genesis(
                committee,
                &roster.validator_keys,
                &roster.user_keys,
            )?;
            for &index in &roster.members {
                self.live_peer_mut(index)?.peer_join(committee, &roster.ips)?;
            }
            debug!(committee = %committee, members = roster.members.len(), "Committee bootstrapped");
        }
        Ok(())
    }

    /// The topology this deployment realises.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// A live peer.
    pub fn peer(&self, index: PeerIndex) -> Option<&DualMembershipPeer<H>> {
        self.peers.get(index.0).and_then(Option::as_ref)
    }

    /// A live peer, mutably.
    pub fn peer_mut(&mut self, index: PeerIndex) -> Option<&mut DualMembershipPeer<H>> {
        self.peers.get_mut(index.0).and_then(Option::as_mut)
    }

    /// All live peers in index order.
    pub fn peers(&self) -> impl Iterator<Item = (PeerIndex, &DualMembershipPeer<H>)> {
        self.peers
            .iter()
            .enumerate()
            .filter_map(|(i, peer)| peer.as_ref().map(|p| (PeerIndex(i), p)))
    }

    /// Number of live peers.
    pub fn live_count(&self) -> usize {
        self.peers.iter().filter(|peer| peer.is_some()).count()
    }

    /// Live members of a committee, ascending.
    pub fn members(&self, committee: CommitteeId) -> Result<Vec<PeerIndex>, H::Error> {
        Ok(self
            .topology
            .members(committee)?
            .into_iter()
            .filter(|index| self.peer(*index).is_some())
            .collect())
    }

    /// Keys and addresses of a committee's live members.
    pub fn roster(&self, committee: CommitteeId) -> Result<Roster, H::Error> {
        let mut roster = Roster {
            members: self.members(committee)?,
            ..Roster::default()
        };
        for &index in &roster.members {
            let peer = self.live_peer(index)?;
            roster.validator_keys.push(peer.validator_key(committee)?);
            roster.user_keys.push(peer.user_key(committee)?);
            roster.ips.push(peer.identity_ip(committee)?);
        }
        Ok(roster)
    }

    /// Submit through the first live member of `tx.quorum`.
    pub fn submit(&mut self, tx: &Transaction) -> Result<(), H::Error> {
        let index = self.first_member(tx.quorum)?;
        self.submit_via(index, tx)
    }

    /// Submit through a specific peer.
    pub fn submit_via(&mut self, index: PeerIndex, tx: &Transaction) -> Result<(), H::Error> {
        self.live_peer_mut(index)?.submit(tx)
    }

    /// Read through the first live member of `tx.quorum`.
    pub fn get(&self, tx: &Transaction) -> Result<Option<String>, H::Error> {
        let index = self.first_member(tx.quorum)?;
        self.live_peer(index)?.get(tx)
    }

    /// Remove a peer and reconfigure both of its committees.
    ///
    /// The peer is shut down first; survivors then receive the reduced key
    /// sets. Both committees are attempted even if one fails, and a
    /// committee left with mixed key sets is logged. The first failure is
    /// returned, the release failure first of all.
    pub fn depart(&mut self, index: PeerIndex) -> Result<(), H::Error> {
        let peer = self
            .peers
            .get_mut(index.0)
            .and_then(Option::take)
            .ok_or(Error::UnknownPeer(index))?;
        let committees = peer.committees();
        let mut first_failure = peer.shutdown().err();

        for committee in committees.as_array() {
            if let Err(e) = self.reconfigure(committee) {
                error!(
                    peer = %index,
                    committee = %committee,
                    error = %e,
                    "Committee left partly reconfigured after departure"
                );
                first_failure.get_or_insert(e);
            }
        }

        info!(peer = %index, committees = %committees, "Peer departed");
        first_failure.map_or(Ok(()), Err)
    }

    /// Hand the current live roster of `committee` to every live member.
    fn reconfigure(&mut self, committee: CommitteeId) -> Result<(), H::Error> {
        let roster = self.roster(committee)?;
        if roster.members.is_empty() {
            warn!(committee = %committee, "Committee has no live members left");
        }
        for &member in &roster.members {
            self.live_peer_mut(member)?.update_membership(
                committee,
                &roster.validator_keys,
                &roster.user_keys,
            )?;
        }
        Ok(())
    }

    /// Shut down every live peer, returning the first failure.
    pub fn shutdown(self) -> Result<(), H::Error> {
        let mut first_failure = None;
        for peer in self.peers.into_iter().flatten() {
            if let Err(e) = peer.shutdown() {
                first_failure.get_or_insert(e);
            }
        }
        debug!("Deployment shut down");
        first_failure.map_or(Ok(()), Err)
    }

    fn first_member(&self, committee: CommitteeId) -> Result<PeerIndex, H::Error> {
        self.members(committee)?
            .first()
            .copied()
            .ok_or(Error::NoLiveMember(committee))
    }

    fn live_peer(&self, index: PeerIndex) -> Result<&DualMembershipPeer<H>, H::Error> {
        self.peer(index).ok_or(Error::UnknownPeer(index))
    }

    fn live_peer_mut(&mut self, index: PeerIndex) -> Result<&mut DualMembershipPeer<H>, H::Error> {
        self.peer_mut(index).ok_or(Error::UnknownPeer(index))
    }
}

impl<H: ReplicaHandle> std::fmt::Debug for Deployment<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("committees", &self.topology.committee_count())
            .field("intersection", &self.topology.intersection())
            .field("live_peers", &self.live_count())
            .finish()
    }
}

/// Acquire both replicas for one assignment, releasing the first if the
/// second cannot be acquired.
fn build_peer<F>(
    assignment: &PeerAssignment,
    factory: &mut F,
) -> Result<DualMembershipPeer<F::Replica>, <F::Replica as ReplicaHandle>::Error>
where
    F: ReplicaFactory,
{
    let pair = assignment.pair;
    let replica_a = factory.acquire(pair.a).map_err(Error::Replica)?;
    let replica_b = match factory.acquire(pair.b) {
        Ok(replica) => replica,
        Err(e) => {
            release_replica(pair.a, replica_a);
            return Err(Error::Replica(e));
        }
    };
    DualMembershipPeer::new((pair.a, replica_a), (pair.b, replica_b))
}

fn release_replica<H: ReplicaHandle>(committee: CommitteeId, mut replica: H) {
    if let Err(e) = replica.release() {
        warn!(committee = %committee, error = %e, "Failed to release replica");
    }
}

fn release_peers<H: ReplicaHandle>(peers: impl Iterator<Item = DualMembershipPeer<H>>) {
    for peer in peers {
        let committees = peer.committees();
        if let Err(e) = peer.shutdown() {
            warn!(committees = %committees, error = %e, "Failed to shut down peer");
        }
    }
}
