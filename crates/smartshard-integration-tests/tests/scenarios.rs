//! Known topologies brought up end to end on in-memory replicas.

use std::collections::HashSet;

use smartshard_integration_tests::bootstrapped;
use smartshard_peer::Transaction;
use smartshard_topology::{CommitteeId, PeerIndex};

#[test]
fn five_committees_single_intersection() {
    let (deployment, cluster) = bootstrapped(5, 1).unwrap();
    let topology = deployment.topology();

    assert_eq!(deployment.live_count(), 10);
    for committee in topology.committees() {
        assert_eq!(deployment.members(committee).unwrap().len(), 4);
        // Genesis only.
        assert_eq!(cluster.height(committee), 1);
        assert_eq!(cluster.validator_keys(committee).len(), 4);
    }
    for a in 0..5 {
        for b in (a + 1)..5 {
            let shared = topology.shared_by(CommitteeId(a), CommitteeId(b)).unwrap();
            assert_eq!(shared.len(), 1, "committees {a} and {b}");
        }
    }

    deployment.shutdown().unwrap();
}

#[test]
fn three_committees_wide_intersection() {
    let (deployment, _cluster) = bootstrapped(3, 5).unwrap();

    assert_eq!(deployment.live_count(), 15);
    for committee in deployment.topology().committees() {
        let roster = deployment.roster(committee).unwrap();
        assert_eq!(roster.members.len(), 10);
        assert_eq!(roster.ips.len(), 10);
        assert_eq!(roster.validator_keys.len(), 10);
    }

    deployment.shutdown().unwrap();
}

#[test]
fn bridge_peer_routes_by_quorum() {
    let (mut deployment, cluster) = bootstrapped(3, 1).unwrap();
    let index = PeerIndex(0);
    let peer = deployment.peer(index).unwrap();
    assert_eq!(peer.committee_id_a(), CommitteeId(0));
    assert_eq!(peer.committee_id_b(), CommitteeId(1));

    let to_a = Transaction::new(CommitteeId(0), "tx_a", "999");
    deployment.submit_via(index, &to_a).unwrap();
    cluster.seal();

    let peer = deployment.peer(index).unwrap();
    assert_eq!(peer.blocks(CommitteeId(0)).unwrap().len(), 2);
    assert_eq!(peer.blocks(CommitteeId(1)).unwrap().len(), 1);
    assert_eq!(peer.get(&to_a).unwrap().as_deref(), Some("999"));

    let stray = Transaction::new(CommitteeId(2), "tx_stray", "999");
    let err = deployment.submit_via(index, &stray).unwrap_err();
    assert!(err.is_unknown_quorum());
    // Nothing was queued for the committee the peer does not serve.
    assert_eq!(cluster.seal(), 0);

    deployment.shutdown().unwrap();
}

#[test]
fn identity_addresses_are_distinct() {
    let (deployment, cluster) = bootstrapped(6, 2).unwrap();

    let mut seen = HashSet::new();
    for (index, peer) in deployment.peers() {
        for committee in peer.committees().as_array() {
            let ip = peer.identity_ip(committee).unwrap();
            assert!(seen.insert(ip), "{ip} reused by peer {index}");
        }
    }
    assert_eq!(seen.len(), 2 * deployment.live_count());
    assert_eq!(cluster.acquired(), seen.len());

    deployment.shutdown().unwrap();
}

#[test]
fn infeasible_topologies_never_acquire_replicas() {
    assert!(bootstrapped(1, 3).is_err());
    assert!(bootstrapped(4, 0).is_err());
}
