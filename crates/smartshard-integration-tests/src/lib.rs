//! Shared fixtures for SmartShard end-to-end tests.
//!
//! [`RecordingCluster`] hands out in-memory replicas that log every call they
//! receive, so tests can check which committee's replica actually served an
//! operation.

use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use smartshard_peer::memory::{InMemoryCluster, InMemoryReplica, ReplicaError};
use smartshard_peer::{BlockList, Deployment, NetworkId, ReplicaFactory, ReplicaHandle};
use smartshard_topology::{CommitteeId, CommitteeTopology};

/// One call observed by a recording replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    /// Committee of the replica that received the call
    pub committee: CommitteeId,
    /// Acquisition order of that replica
    pub replica: usize,
    /// Operation name
    pub op: &'static str,
}

/// Calls in the order replicas received them.
pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// In-memory replica that logs each call before delegating.
#[derive(Debug)]
pub struct RecordingReplica {
    replica: usize,
    inner: InMemoryReplica,
    log: CallLog,
}

impl RecordingReplica {
    fn record(&self, op: &'static str) {
        self.log.lock().push(Call {
            committee: self.inner.committee(),
            replica: self.replica,
            op,
        });
    }

    /// The wrapped replica.
    pub fn inner(&self) -> &InMemoryReplica {
        &self.inner
    }
}

impl ReplicaHandle for RecordingReplica {
    type Error = ReplicaError;

    fn make_genesis(&mut self, validator_keys: &[String], user_keys: &[String]) -> Result<(), ReplicaError> {
        self.record("make_genesis");
        self.inner.make_genesis(validator_keys, user_keys)
    }

    fn join_network(&mut self, peers: &[IpAddr]) -> Result<(), ReplicaError> {
        self.record("join_network");
        self.inner.join_network(peers)
    }

    fn submit_tx(&mut self, key: &str, value: &str) -> Result<(), ReplicaError> {
        self.record("submit_tx");
        self.inner.submit_tx(key, value)
    }

    fn get_tx(&self, key: &str) -> Result<Option<String>, ReplicaError> {
        self.record("get_tx");
        self.inner.get_tx(key)
    }

    fn identity_ip(&self) -> Result<IpAddr, ReplicaError> {
        self.record("identity_ip");
        self.inner.identity_ip()
    }

    fn user_key(&self) -> Result<String, ReplicaError> {
        self.record("user_key");
        self.inner.user_key()
    }

    fn validator_key(&self) -> Result<String, ReplicaError> {
        self.record("validator_key");
        self.inner.validator_key()
    }

    fn blocks(&self) -> Result<BlockList, ReplicaError> {
        self.record("blocks");
        self.inner.blocks()
    }

    fn protocol_call(&self, request: &str) -> Result<serde_json::Value, ReplicaError> {
        self.record("protocol_call");
        self.inner.protocol_call(request)
    }

    fn update_membership(&mut self, validator_keys: &[String], user_keys: &[String]) -> Result<(), ReplicaError> {
        self.record("update_membership");
        self.inner.update_membership(validator_keys, user_keys)
    }

    fn attached_network(&self) -> Result<NetworkId, ReplicaError> {
        self.record("attached_network");
        self.inner.attached_network()
    }

    fn release(&mut self) -> Result<(), ReplicaError> {
        self.record("release");
        self.inner.release()
    }
}

/// Factory of recording replicas over one in-memory cluster.
#[derive(Debug, Default)]
pub struct RecordingCluster {
    cluster: InMemoryCluster,
    log: CallLog,
    acquired: usize,
}

impl RecordingCluster {
    /// The underlying cluster, for sealing blocks.
    pub fn cluster(&self) -> &InMemoryCluster {
        &self.cluster
    }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().clone()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl ReplicaFactory for RecordingCluster {
    type Replica = RecordingReplica;

    fn acquire(&mut self, committee: CommitteeId) -> Result<RecordingReplica, ReplicaError> {
        let inner = self.cluster.acquire(committee)?;
        let replica = self.acquired;
        self.acquired += 1;
        Ok(RecordingReplica {
            replica,
            inner,
            log: Arc::clone(&self.log),
        })
    }
}

/// Generate a topology and bring it up on in-memory replicas.
pub fn bootstrapped(
    committee_count: u32,
    intersection: usize,
) -> smartshard_peer::Result<(Deployment<InMemoryReplica>, InMemoryCluster), ReplicaError> {
    let topology = CommitteeTopology::generate(committee_count, intersection)?;
    let mut cluster = InMemoryCluster::default();
    let mut deployment = Deployment::assemble(topology, &mut cluster)?;
    deployment.bootstrap()?;
    Ok((deployment, cluster))
}

/// Like [`bootstrapped`], over recording replicas.
pub fn bootstrapped_recording(
    committee_count: u32,
    intersection: usize,
) -> smartshard_peer::Result<(Deployment<RecordingReplica>, RecordingCluster), ReplicaError> {
    let topology = CommitteeTopology::generate(committee_count, intersection)?;
    let mut cluster = RecordingCluster::default();
    let mut deployment = Deployment::assemble(topology, &mut cluster)?;
    deployment.bootstrap()?;
    Ok((deployment, cluster))
}
