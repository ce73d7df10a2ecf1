//! The consensus replica seam.
//!
//! A [`ReplicaHandle`] is one running consensus-replica instance serving one
//! committee. Process supervision, transport and consensus all live behind
//! this trait; the routing layer only ever calls through it.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use smartshard_topology::CommitteeId;

/// Identifier of the virtual network a replica is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub String);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetworkId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NetworkId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A committed block as reported by a replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Height, genesis is 0
    pub number: u64,
    /// Block identifier (hex)
    pub id: String,
    /// Key/value writes carried by the block
    pub entries: Vec<(String, String)>,
}

/// Raw block listing response; peers unwrap `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockList {
    /// Committed blocks, oldest first
    pub data: Vec<Block>,
}

/// Handle to one running consensus replica.
///
/// Calls are synchronous and may block on I/O. Errors are opaque to the
/// routing layer and surface unchanged.
pub trait ReplicaHandle: Send {
    /// Failure type of the underlying replica.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Initialise genesis state with the committee's keys.
    fn make_genesis(&mut self, validator_keys: &[String], user_keys: &[String]) -> Result<(), Self::Error>;

    /// Join the consensus network formed by `peers`.
    fn join_network(&mut self, peers: &[IpAddr]) -> Result<(), Self::Error>;

    /// Submit a key/value write.
    fn submit_tx(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Read a committed value.
    fn get_tx(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Address of this replica on its network.
    fn identity_ip(&self) -> Result<IpAddr, Self::Error>;

    /// Public user key.
    fn user_key(&self) -> Result<String, Self::Error>;

    /// Public validator key.
    fn validator_key(&self) -> Result<String, Self::Error>;

    /// Committed blocks.
    fn blocks(&self) -> Result<BlockList, Self::Error>;

    /// Raw pass-through to the replica's own API.
    fn protocol_call(&self, request: &str) -> Result<serde_json::Value, Self::Error>;

    /// Replace the committee's validator and user key sets.
    fn update_membership(&mut self, validator_keys: &[String], user_keys: &[String]) -> Result<(), Self::Error>;

    /// Network this replica is attached to.
    fn attached_network(&self) -> Result<NetworkId, Self::Error>;

    /// Stop the replica and free its resources.
    fn release(&mut self) -> Result<(), Self::Error>;
}

/// Source of fresh replicas for a committee.
pub trait ReplicaFactory {
    /// Replica type handed out.
    type Replica: ReplicaHandle;

    /// Start a replica that will serve `committee`.
    fn acquire(
        &mut self,
        committee: CommitteeId,
    ) -> Result<Self::Replica, <Self::Replica as ReplicaHandle>::Error>;
}
