//! Dual-membership peer - one peer, two committees, two replicas.
//!
//! A [`DualMembershipPeer`] sits at the intersection of two committees and
//! owns one replica for each. Every committee-scoped call is routed through a
//! single lookup over a fixed two-slot table:
//!
//! - id matches slot a → replica a
//! - id matches slot b → replica b
//! - anything else → one `error!` event and [`Error::UnknownQuorum`], neither
//!   replica is touched
//!
//! # Concurrency
//!
//! Mutating operations take `&mut self`, so a peer has at most one writer at
//! a time. Share a peer across threads behind a mutex.
//!
//! The two replicas are independent. [`DualMembershipPeer::split_mut`] borrows
//! them as two [`CommitteeHalf`]s that can be driven from different threads
//! at once, one committee each.
//!
//! # Teardown
//!
//! Call [`DualMembershipPeer::shutdown`] to release both replicas and observe
//! failures. A peer dropped without `shutdown` still releases its replicas,
//! logging a warning.

use std::fmt;
use std::net::IpAddr;

use smartshard_topology::{CommitteeId, CommitteePair};
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::replica::{Block, NetworkId, ReplicaHandle};
use crate::transaction::Transaction;

/// A committee id bound to the replica serving it.
struct Slot<H> {
    committee: CommitteeId,
    replica: H,
    released: bool,
}

/// A peer bridging two committees.
pub struct DualMembershipPeer<H: ReplicaHandle> {
    slots: [Slot<H>; 2],
}

impl<H: ReplicaHandle> DualMembershipPeer<H> {
    /// Bind two replicas to the committees they serve.
    ///
    /// Fails with [`Error::DuplicateCommittee`] if both ids are equal; both
    /// replicas are released before returning.
    pub fn new(
        (committee_a, replica_a): (CommitteeId, H),
        (committee_b, replica_b): (CommitteeId, H),
    ) -> Result<Self, H::Error> {
        let mut peer = Self {
            slots: [
                Slot {
                    committee: committee_a,
                    replica: replica_a,
                    released: false,
                },
                Slot {
                    committee: committee_b,
                    replica: replica_b,
                    released: false,
                },
            ],
        };

        if committee_a == committee_b {
            error!(committee = %committee_a, "PEER: both replicas bound to the same committee");
            // Release failures are already logged; the duplicate is the error to report.
            let _ = peer.release_all();
            return Err(Error::DuplicateCommittee(committee_a));
        }

        debug!(committees = %peer.committees(), "Created dual-membership peer");
        Ok(peer)
    }

    /// The committees served, in slot order.
    pub fn committees(&self) -> CommitteePair {
        CommitteePair {
            a: self.slots[0].committee,
            b: self.slots[1].committee,
        }
    }

    /// Committee served by replica a.
    pub fn committee_id_a(&self) -> CommitteeId {
        self.slots[0].committee
    }

    /// Committee served by replica b.
    pub fn committee_id_b(&self) -> CommitteeId {
        self.slots[1].committee
    }

    /// Whether this peer serves `committee`.
    pub fn is_member(&self, committee: CommitteeId) -> bool {
        self.slots.iter().any(|slot| slot.committee == committee)
    }

    /// The other committee bridged by this peer.
    pub fn counterpart(&self, committee: CommitteeId) -> Option<CommitteeId> {
        self.committees().counterpart(committee)
    }

    /// Initialise genesis state of one committee's replica.
    pub fn make_genesis(
        &mut self,
        committee: CommitteeId,
        validator_keys: &[String],
        user_keys: &[String],
    ) -> Result<(), H::Error> {
        self.with_replica_mut("make_genesis", committee, |r| {
            r.make_genesis(validator_keys, user_keys)
        })
    }

    /// Join both consensus networks: replica a joins `committee_a_ips`,
    /// replica b joins `committee_b_ips`.
    pub fn join_network(
        &mut self,
        committee_a_ips: &[IpAddr],
        committee_b_ips: &[IpAddr],
    ) -> Result<(), H::Error> {
        let [a, b] = &mut self.slots;
        a.replica.join_network(committee_a_ips).map_err(Error::Replica)?;
        b.replica.join_network(committee_b_ips).map_err(Error::Replica)
    }

    /// Join one committee's consensus network.
    pub fn peer_join(&mut self, committee: CommitteeId, ips: &[IpAddr]) -> Result<(), H::Error> {
        self.with_replica_mut("peer_join", committee, |r| r.join_network(ips))
    }

    /// Submit a transaction to the replica serving `tx.quorum`.
    pub fn submit(&mut self, tx: &Transaction) -> Result<(), H::Error> {
        self.with_replica_mut("submit", tx.quorum, |r| r.submit_tx(&tx.key, &tx.value))
    }

    /// Read the committed value for `tx.key` from the replica serving `tx.quorum`.
    ///
    /// `Ok(None)` means the key is not committed yet.
    pub fn get(&self, tx: &Transaction) -> Result<Option<String>, H::Error> {
        self.with_replica("get", tx.quorum, |r| r.get_tx(&tx.key))
    }

    /// Address of the replica serving `committee`.
    pub fn identity_ip(&self, committee: CommitteeId) -> Result<IpAddr, H::Error> {
        self.with_replica("identity_ip", committee, |r| r.identity_ip())
    }

    /// User key of the replica serving `committee`.
    pub fn user_key(&self, committee: CommitteeId) -> Result<String, H::Error> {
        self.with_replica("user_key", committee, |r| r.user_key())
    }

    /// Validator key of the replica serving `committee`.
    pub fn validator_key(&self, committee: CommitteeId) -> Result<String, H::Error> {
        self.with_replica("validator_key", committee, |r| r.validator_key())
    }

    /// Committed blocks of `committee`, oldest first.
    pub fn blocks(&self, committee: CommitteeId) -> Result<Vec<Block>, H::Error> {
        self.with_replica("blocks", committee, |r| r.blocks())
            .map(|list| list.data)
    }

    /// Raw pass-through to the replica API of `committee`.
    pub fn protocol_call(
        &self,
        committee: CommitteeId,
        request: &str,
    ) -> Result<serde_json::Value, H::Error> {
        self.with_replica("protocol_call", committee, |r| r.protocol_call(request))
    }

    /// Reconfigure a committee's key sets after a peer joins or departs.
    pub fn update_membership(
        &mut self,
        committee: CommitteeId,
        validator_keys: &[String],
        user_keys: &[String],
    ) -> Result<(), H::Error> {
        self.with_replica_mut("update_membership", committee, |r| {
            r.update_membership(validator_keys, user_keys)
        })
    }

    /// Network of replica a.
    ///
    /// Both halves of a bridge should share one network. A mismatch (or a
    /// failure to query replica b) is logged as a warning and replica a's
    /// network is still returned.
    pub fn attached_network(&self) -> Result<NetworkId, H::Error> {
        let [a, b] = &self.slots;
        let network = a.replica.attached_network().map_err(Error::Replica)?;

        match b.replica.attached_network() {
            Ok(other) if other != network => warn!(
                committees = %self.committees(),
                network_a = %network,
                network_b = %other,
                "PEER: replicas attached to different networks, only a is given"
            ),
            Ok(_) => {}
            Err(e) => warn!(
                committees = %self.committees(),
                error = %e,
                "PEER: could not query network of replica b"
            ),
        }

        Ok(network)
    }

    /// Borrow both replicas separately, in slot order.
    ///
    /// Each half only accepts transactions for its own committee, so the two
    /// can be used concurrently without touching each other's replica.
    pub fn split_mut(&mut self) -> (CommitteeHalf<'_, H>, CommitteeHalf<'_, H>) {
        let known = self.committees();
        let [a, b] = &mut self.slots;
        (
            CommitteeHalf {
                known,
                committee: a.committee,
                replica: &mut a.replica,
            },
            CommitteeHalf {
                known,
                committee: b.committee,
                replica: &mut b.replica,
            },
        )
    }

    /// Release both replicas.
    ///
    /// Both are attempted even if the first fails; the first failure is
    /// returned.
    pub fn shutdown(mut self) -> Result<(), H::Error> {
        debug!(committees = %self.committees(), "Shutting down dual-membership peer");
        self.release_all()
    }

    fn release_all(&mut self) -> Result<(), H::Error> {
        let mut first_failure = None;
        for slot in self.slots.iter_mut().filter(|slot| !slot.released) {
            slot.released = true;
            if let Err(e) = slot.replica.release() {
                warn!(committee = %slot.committee, error = %e, "PEER: failed to release replica");
                first_failure.get_or_insert(e);
            }
        }
        first_failure.map_or(Ok(()), |e| Err(Error::Replica(e)))
    }

    /// Resolve a committee to its slot, logging unknown quorums.
    fn route(&self, op: &'static str, committee: CommitteeId) -> Result<usize, H::Error> {
        match self.slots.iter().position(|slot| slot.committee == committee) {
            Some(slot) => {
                trace!(op, committee = %committee, slot, "Routing request");
                Ok(slot)
            }
            None => {
                let known = self.committees();
                error!(
                    op,
                    known = %known,
                    requested = %committee,
                    "PEER: request for unknown quorum"
                );
                Err(Error::UnknownQuorum {
                    known,
                    requested: committee,
                })
            }
        }
    }

    fn with_replica<T>(
        &self,
        op: &'static str,
        committee: CommitteeId,
        call: impl FnOnce(&H) -> std::result::Result<T, H::Error>,
    ) -> Result<T, H::Error> {
        let slot = self.route(op, committee)?;
        call(&self.slots[slot].replica).map_err(Error::Replica)
    }

    fn with_replica_mut<T>(
        &mut self,
        op: &'static str,
        committee: CommitteeId,
        call: impl FnOnce(&mut H) -> std::result::Result<T, H::Error>,
    ) -> Result<T, H::Error> {
        let slot = self.route(op, committee)?;
        call(&mut self.slots[slot].replica).map_err(Error::Replica)
    }
}

/// One committee's replica, borrowed from a [`DualMembershipPeer`].
pub struct CommitteeHalf<'p, H: ReplicaHandle> {
    known: CommitteePair,
    committee: CommitteeId,
    replica: &'p mut H,
}

impl<H: ReplicaHandle> CommitteeHalf<'_, H> {
    /// Committee served by this half.
    pub fn committee(&self) -> CommitteeId {
        self.committee
    }

    /// Submit a transaction; `tx.quorum` must be this half's committee.
    pub fn submit(&mut self, tx: &Transaction) -> Result<(), H::Error> {
        self.check("submit", tx.quorum)?;
        self.replica
            .submit_tx(&tx.key, &tx.value)
            .map_err(Error::Replica)
    }

    /// Read the committed value for `tx.key`; `tx.quorum` must match.
    pub fn get(&self, tx: &Transaction) -> Result<Option<String>, H::Error> {
        self.check("get", tx.quorum)?;
        self.replica.get_tx(&tx.key).map_err(Error::Replica)
    }

    /// Committed blocks of this half's committee.
    pub fn blocks(&self) -> Result<Vec<Block>, H::Error> {
        self.replica
            .blocks()
            .map(|list| list.data)
            .map_err(Error::Replica)
    }

    fn check(&self, op: &'static str, committee: CommitteeId) -> Result<(), H::Error> {
        if committee == self.committee {
            return Ok(());
        }
        error!(
            op,
            known = %self.known,
            half = %self.committee,
            requested = %committee,
            "PEER: request for unknown quorum"
        );
        Err(Error::UnknownQuorum {
            known: self.known,
            requested: committee,
        })
    }
}

impl<H: ReplicaHandle> fmt::Debug for CommitteeHalf<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitteeHalf")
            .field("committee", &self.committee)
            .finish()
    }
}

impl<H: ReplicaHandle> Drop for DualMembershipPeer<H> {
    fn drop(&mut self) {
        if self.slots.iter().any(|slot| !slot.released) {
            warn!(committees = %self.committees(), "PEER: dropped without shutdown, releasing replicas");
            let _ = self.release_all();
        }
    }
}

impl<H: ReplicaHandle> fmt::Debug for DualMembershipPeer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualMembershipPeer")
            .field("committee_id_a", &self.slots[0].committee)
            .field("committee_id_b", &self.slots[1].committee)
            .finish()
    }
}
