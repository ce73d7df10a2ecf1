//! SmartShard Peers - Dual-Membership Routing
//!
//! Every peer of an overlapping committee topology belongs to exactly two
//! committees and runs one consensus replica for each. This crate provides
//! the routing layer above those replicas.
//!
//! # Overview
//!
//! - [`ReplicaHandle`] is the seam to a running consensus replica. Consensus,
//!   transport and process supervision all live behind it.
//! - [`DualMembershipPeer`] owns two replicas and routes every operation by
//!   committee id. Unknown ids are logged and rejected with
//!   [`Error::UnknownQuorum`]; neither replica is touched.
//! - [`Deployment`] binds a whole [`Topology`](smartshard_topology::Topology)
//!   to replicas from a [`ReplicaFactory`], bootstraps every committee and
//!   reconfigures committees when a peer departs.
//! - [`memory`] provides in-memory replicas for tests and simulation.
//!
//! # Example
//!
//! ```rust
//! use smartshard_peer::{memory::InMemoryCluster, Deployment, Transaction};
//! use smartshard_topology::{CommitteeId, CommitteeTopology};
//!
//! let topology = CommitteeTopology::generate(5, 1).unwrap();
//! let mut cluster = InMemoryCluster::default();
//! let mut deployment = Deployment::assemble(topology, &mut cluster).unwrap();
//! deployment.bootstrap().unwrap();
//!
//! let tx = Transaction::new(CommitteeId(2), "tx_0", "999");
//! deployment.submit(&tx).unwrap();
//! cluster.seal();
//! assert_eq!(deployment.get(&tx).unwrap().as_deref(), Some("999"));
//!
//! deployment.shutdown().unwrap();
//! ```

pub mod deployment;
pub mod error;
pub mod memory;
pub mod peer;
pub mod replica;
pub mod transaction;

pub use deployment::{Deployment, Roster};
pub use error::{Error, Result};
pub use peer::{CommitteeHalf, DualMembershipPeer};
pub use replica::{Block, BlockList, NetworkId, ReplicaFactory, ReplicaHandle};
pub use transaction::Transaction;
