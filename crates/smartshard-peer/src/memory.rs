//! In-memory replicas for tests and simulation.
//!
//! An [`InMemoryCluster`] hands out [`InMemoryReplica`]s. All replicas of one
//! committee share a single ledger, so a write submitted through any member
//! becomes visible to every member once the cluster seals a block.
//!
//! Nothing here agrees on anything: sealing is an explicit call standing in
//! for the external consensus protocol.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use parking_lot::Mutex;
use smartshard_topology::CommitteeId;
use thiserror::Error;
use tracing::{debug, trace};

use crate::replica::{Block, BlockList, NetworkId, ReplicaFactory, ReplicaHandle};

/// Default network name for in-memory clusters.
pub const DEFAULT_NETWORK: &str = "smartshard-net";

/// Failures of in-memory replicas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicaError {
    /// `make_genesis` was called twice on one committee.
    #[error("committee {0} already has a genesis block")]
    GenesisExists(CommitteeId),

    /// The committee has no genesis block yet.
    #[error("committee {0} has no genesis block")]
    NotInitialised(CommitteeId),

    /// The replica was released.
    #[error("replica {0} has been released")]
    Released(IpAddr),

    /// `protocol_call` received a request it does not understand.
    #[error("unsupported protocol request: {0}")]
    UnsupportedRequest(String),

    /// The cluster ran out of addresses.
    #[error("address space exhausted")]
    AddressesExhausted,
}

/// One committee's shared chain.
#[derive(Debug, Default)]
struct Ledger {
    validator_keys: Vec<String>,
    user_keys: Vec<String>,
    blocks: Vec<Block>,
    pending: Vec<(String, String)>,
    state: HashMap<String, String>,
}

impl Ledger {
    fn has_genesis(&self) -> bool {
        !self.blocks.is_empty()
    }

    fn append(&mut self, entries: Vec<(String, String)>) -> &Block {
        let number = self.blocks.len() as u64;
        let mut hasher = blake3::Hasher::new();
        if let Some(parent) = self.blocks.last() {
            hasher.update(parent.id.as_bytes());
        }
        hasher.update(&number.to_le_bytes());
        for (key, value) in &entries {
            hasher.update(key.as_bytes());
            hasher.update(value.as_bytes());
        }

        for (key, value) in &entries {
            self.state.insert(key.clone(), value.clone());
        }
        self.blocks.push(Block {
            number,
            id: hasher.finalize().to_hex().to_string(),
            entries,
        });
        &self.blocks[self.blocks.len() - 1]
    }
}

/// Factory and shared state for in-memory replicas.
#[derive(Debug)]
pub struct InMemoryCluster {
    network: NetworkId,
    ledgers: HashMap<CommitteeId, Arc<Mutex<Ledger>>>,
    next_host: u32,
    acquired: usize,
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK)
    }
}

impl InMemoryCluster {
    /// First host number handed out (10.0.0.2).
    const FIRST_HOST: u32 = 2;

    /// Create a cluster whose replicas attach to `network`.
    pub fn new(network: impl Into<NetworkId>) -> Self {
        Self {
            network: network.into(),
            ledgers: HashMap::new(),
            next_host: Self::FIRST_HOST,
            acquired: 0,
        }
    }

    /// Number of replicas handed out so far.
    pub fn acquired(&self) -> usize {
        self.acquired
    }

    /// Pack every committee's pending writes into one new block each.
    ///
    /// Returns the number of blocks sealed.
    pub fn seal(&self) -> usize {
        let mut sealed = 0;
        for (committee, ledger) in &self.ledgers {
            let mut ledger = ledger.lock();
            if !ledger.has_genesis() || ledger.pending.is_empty() {
                continue;
            }
            let entries = std::mem::take(&mut ledger.pending);
            let block = ledger.append(entries);
            trace!(committee = %committee, number = block.number, "Sealed block");
            sealed += 1;
        }
        sealed
    }

    /// Number of blocks in a committee's chain, including genesis.
    pub fn height(&self, committee: CommitteeId) -> usize {
        self.ledgers
            .get(&committee)
            .map_or(0, |ledger| ledger.lock().blocks.len())
    }

    /// Current validator keys of a committee.
    pub fn validator_keys(&self, committee: CommitteeId) -> Vec<String> {
        self.ledgers
            .get(&committee)
            .map(|ledger| ledger.lock().validator_keys.clone())
            .unwrap_or_default()
    }

    fn next_ip(&mut self) -> Result<IpAddr, ReplicaError> {
        let host = self.next_host;
        // Stay inside 10.0.0.0/8.
        if host >= 1 << 24 {
            return Err(ReplicaError::AddressesExhausted);
        }
        self.next_host += 1;
        let [_, b, c, d] = host.to_be_bytes();
        Ok(IpAddr::V4(Ipv4Addr::new(10, b, c, d)))
    }
}

impl ReplicaFactory for InMemoryCluster {
    type Replica = InMemoryReplica;

    fn acquire(&mut self, committee: CommitteeId) -> Result<InMemoryReplica, ReplicaError> {
        let ip = self.next_ip()?;
        let ledger = Arc::clone(self.ledgers.entry(committee).or_default());
        self.acquired += 1;

        debug!(committee = %committee, ip = %ip, "Acquired in-memory replica");
        Ok(InMemoryReplica {
            committee,
            ip,
            network: self.network.clone(),
            validator_key: derive_key("validator", ip),
            user_key: derive_key("user", ip),
            peers: Vec::new(),
            ledger,
            released: false,
        })
    }
}

fn derive_key(role: &str, ip: IpAddr) -> String {
    let digest = blake3::hash(format!("{role}:{ip}").as_bytes());
    hex::encode(digest.as_bytes())
}

/// A replica backed by its committee's shared in-memory ledger.
#[derive(Debug)]
pub struct InMemoryReplica {
    committee: CommitteeId,
    ip: IpAddr,
    network: NetworkId,
    validator_key: String,
    user_key: String,
    peers: Vec<IpAddr>,
    ledger: Arc<Mutex<Ledger>>,
    released: bool,
}

impl InMemoryReplica {
    /// Committee this replica serves.
    pub fn committee(&self) -> CommitteeId {
        self.committee
    }

    /// Peers passed to the last `join_network`.
    pub fn peers(&self) -> &[IpAddr] {
        &self.peers
    }

    /// Whether `release` has been called.
    pub fn is_released(&self) -> bool {
        self.released
    }

    fn live(&self) -> Result<(), ReplicaError> {
        if self.released {
            Err(ReplicaError::Released(self.ip))
        } else {
            Ok(())
        }
    }
}

impl ReplicaHandle for InMemoryReplica {
    type Error = ReplicaError;

    fn make_genesis(&mut self, validator_keys: &[String], user_keys: &[String]) -> Result<(), ReplicaError> {
        self.live()?;
        let mut ledger = self.ledger.lock();
        if ledger.has_genesis() {
            return Err(ReplicaError::GenesisExists(self.committee));
        }
        ledger.validator_keys = validator_keys.to_vec();
        ledger.user_keys = user_keys.to_vec();
        ledger.append(Vec::new());
        debug!(committee = %self.committee, validators = validator_keys.len(), "Genesis created");
        Ok(())
    }

    fn join_network(&mut self, peers: &[IpAddr]) -> Result<(), ReplicaError> {
        self.live()?;
        self.peers = peers.to_vec();
        Ok(())
    }

    fn submit_tx(&mut self, key: &str, value: &str) -> Result<(), ReplicaError> {
        self.live()?;
        let mut ledger = self.ledger.lock();
        if !ledger.has_genesis() {
            return Err(ReplicaError::NotInitialised(self.committee));
        }
        ledger.pending.push((key.to_owned(), value.to_owned()));
        Ok(())
    }

    fn get_tx(&self, key: &str) -> Result<Option<String>, ReplicaError> {
        self.live()?;
        let ledger = self.ledger.lock();
        if !ledger.has_genesis() {
            return Err(ReplicaError::NotInitialised(self.committee));
        }
        Ok(ledger.state.get(key).cloned())
    }

    fn identity_ip(&self) -> Result<IpAddr, ReplicaError> {
        self.live()?;
        Ok(self.ip)
    }

    fn user_key(&self) -> Result<String, ReplicaError> {
        self.live()?;
        Ok(self.user_key.clone())
    }

    fn validator_key(&self) -> Result<String, ReplicaError> {
        self.live()?;
        Ok(self.validator_key.clone())
    }

    fn blocks(&self) -> Result<BlockList, ReplicaError> {
        self.live()?;
        Ok(BlockList {
            data: self.ledger.lock().blocks.clone(),
        })
    }

    /// Supports `blocks`, `peers` and `state/<key>`.
    fn protocol_call(&self, request: &str) -> Result<serde_json::Value, ReplicaError> {
        self.live()?;
        let request = request.trim_start_matches('/');
        match request {
            "blocks" => Ok(serde_json::json!(self.blocks()?)),
            "peers" => Ok(serde_json::json!(self.peers)),
            _ => match request.strip_prefix("state/") {
                Some(key) => Ok(serde_json::json!(self.get_tx(key)?)),
                None => Err(ReplicaError::UnsupportedRequest(request.to_owned())),
            },
        }
    }

    fn update_membership(&mut self, validator_keys: &[String], user_keys: &[String]) -> Result<(), ReplicaError> {
        self.live()?;
        let mut ledger = self.ledger.lock();
        ledger.validator_keys = validator_keys.to_vec();
        ledger.user_keys = user_keys.to_vec();
        debug!(committee = %self.committee, validators = validator_keys.len(), "Membership updated");
        Ok(())
    }

    fn attached_network(&self) -> Result<NetworkId, ReplicaError> {
        self.live()?;
        Ok(self.network.clone())
    }

    fn release(&mut self) -> Result<(), ReplicaError> {
        self.live()?;
        self.released = true;
        trace!(committee = %self.committee, ip = %self.ip, "Released in-memory replica");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis(replica: &mut InMemoryReplica) {
        replica
            .make_genesis(&["v".to_owned()], &["u".to_owned()])
            .unwrap();
    }

    #[test]
    fn test_addresses_and_keys_are_unique() {
        let mut cluster = InMemoryCluster::default();
        let a = cluster.acquire(CommitteeId(0)).unwrap();
        let b = cluster.acquire(CommitteeId(0)).unwrap();
        assert_eq!(a.identity_ip().unwrap(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
        assert_ne!(a.identity_ip().unwrap(), b.identity_ip().unwrap());
        assert_ne!(a.validator_key().unwrap(), b.validator_key().unwrap());
        assert_ne!(a.validator_key().unwrap(), a.user_key().unwrap());
        assert_eq!(cluster.acquired(), 2);
    }

    #[test]
    fn test_committee_members_share_a_ledger() {
        let mut cluster = InMemoryCluster::default();
        let mut a = cluster.acquire(CommitteeId(0)).unwrap();
        let b = cluster.acquire(CommitteeId(0)).unwrap();
        let mut other = cluster.acquire(CommitteeId(1)).unwrap();
        genesis(&mut a);
        genesis(&mut other);

        a.submit_tx("k", "v").unwrap();
        assert_eq!(b.get_tx("k").unwrap(), None);

        assert_eq!(cluster.seal(), 1);
        assert_eq!(b.get_tx("k").unwrap().as_deref(), Some("v"));
        assert_eq!(other.get_tx("k").unwrap(), None);
        assert_eq!(cluster.height(CommitteeId(0)), 2);
        assert_eq!(cluster.height(CommitteeId(1)), 1);
    }

    #[test]
    fn test_blocks_chain_ids() {
        let mut cluster = InMemoryCluster::default();
        let mut a = cluster.acquire(CommitteeId(0)).unwrap();
        genesis(&mut a);
        a.submit_tx("k", "v").unwrap();
        cluster.seal();

        let blocks = a.blocks().unwrap().data;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].number, 1);
        assert_ne!(blocks[0].id, blocks[1].id);
        assert_eq!(blocks[1].entries, vec![("k".to_owned(), "v".to_owned())]);
    }

    #[test]
    fn test_genesis_only_once() {
        let mut cluster = InMemoryCluster::default();
        let mut a = cluster.acquire(CommitteeId(3)).unwrap();
        let mut b = cluster.acquire(CommitteeId(3)).unwrap();
        genesis(&mut a);
        assert_eq!(
            b.make_genesis(&[], &[]),
            Err(ReplicaError::GenesisExists(CommitteeId(3)))
        );
    }

    #[test]
    fn test_submit_before_genesis() {
        let mut cluster = InMemoryCluster::default();
        let mut a = cluster.acquire(CommitteeId(0)).unwrap();
        assert_eq!(
            a.submit_tx("k", "v"),
            Err(ReplicaError::NotInitialised(CommitteeId(0)))
        );
    }

    #[test]
    fn test_released_replica_refuses_calls() {
        let mut cluster = InMemoryCluster::default();
        let mut a = cluster.acquire(CommitteeId(0)).unwrap();
        a.release().unwrap();
        assert!(a.is_released());
        assert!(matches!(a.identity_ip(), Err(ReplicaError::Released(_))));
        assert!(matches!(a.release(), Err(ReplicaError::Released(_))));
    }

    #[test]
    fn test_protocol_call_paths() {
        let mut cluster = InMemoryCluster::default();
        let mut a = cluster.acquire(CommitteeId(0)).unwrap();
        genesis(&mut a);
        a.join_network(&[IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9))]).unwrap();

        assert_eq!(a.protocol_call("/peers").unwrap(), serde_json::json!(["10.0.0.9"]));
        assert_eq!(a.protocol_call("blocks").unwrap()["data"].as_array().unwrap().len(), 1);
        assert_eq!(a.protocol_call("state/missing").unwrap(), serde_json::Value::Null);
        assert!(matches!(
            a.protocol_call("batches"),
            Err(ReplicaError::UnsupportedRequest(_))
        ));
    }

    #[test]
    fn test_update_membership_replaces_keys() {
        let mut cluster = InMemoryCluster::default();
        let mut a = cluster.acquire(CommitteeId(0)).unwrap();
        genesis(&mut a);
        a.update_membership(&["v2".to_owned(), "v3".to_owned()], &[]).unwrap();
        assert_eq!(cluster.validator_keys(CommitteeId(0)), vec!["v2", "v3"]);
    }
}
