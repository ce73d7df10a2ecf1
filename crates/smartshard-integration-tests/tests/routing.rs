//! Which replica serves each committee-scoped operation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use smartshard_integration_tests::{bootstrapped_recording, Call};
use smartshard_peer::Transaction;
use smartshard_topology::{CommitteeId, PeerIndex};
use tracing::Level;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

struct ErrorCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn errors_logged<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let hits = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(ErrorCounter(Arc::clone(&hits)));
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, hits.load(Ordering::SeqCst))
}

#[test]
fn bootstrap_touches_each_replica_for_its_own_committee() {
    let (deployment, cluster) = bootstrapped_recording(4, 1).unwrap();

    let calls = cluster.calls();
    let geneses: Vec<&Call> = calls.iter().filter(|c| c.op == "make_genesis").collect();
    assert_eq!(geneses.len(), 4);

    for (index, peer) in deployment.peers() {
        let [a, b] = peer.committees().as_array();
        let (replica_a, replica_b) = (2 * index.0, 2 * index.0 + 1);
        for call in calls.iter().filter(|c| c.replica == replica_a) {
            assert_eq!(call.committee, a);
        }
        for call in calls.iter().filter(|c| c.replica == replica_b) {
            assert_eq!(call.committee, b);
        }
        assert!(calls.contains(&Call { committee: a, replica: replica_a, op: "join_network" }));
        assert!(calls.contains(&Call { committee: b, replica: replica_b, op: "join_network" }));
    }

    deployment.shutdown().unwrap();
}

#[test]
fn operations_reach_only_the_addressed_replica() {
    let (mut deployment, cluster) = bootstrapped_recording(3, 1).unwrap();
    let index = PeerIndex(0);
    cluster.clear();

    let tx = Transaction::new(CommitteeId(1), "tx_b", "999");
    deployment.submit_via(index, &tx).unwrap();
    cluster.cluster().seal();

    let peer = deployment.peer(index).unwrap();
    peer.get(&tx).unwrap();
    peer.blocks(CommitteeId(1)).unwrap();
    let value = peer.protocol_call(CommitteeId(1), "state/tx_b").unwrap();
    assert_eq!(value, serde_json::json!("999"));

    let calls = cluster.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.replica == 1 && c.committee == CommitteeId(1)));

    deployment.shutdown().unwrap();
}

#[test]
fn unknown_quorum_is_logged_once_and_touches_nothing() {
    let (mut deployment, cluster) = bootstrapped_recording(3, 1).unwrap();
    let index = PeerIndex(0);
    cluster.clear();

    let stray = Transaction::new(CommitteeId(2), "tx_stray", "999");
    let (result, errors) = errors_logged(|| deployment.submit_via(index, &stray));

    assert!(result.unwrap_err().is_unknown_quorum());
    assert_eq!(errors, 1);
    assert!(cluster.calls().is_empty());

    let peer = deployment.peer_mut(index).unwrap();
    let (result, errors) = errors_logged(|| peer.update_membership(CommitteeId(2), &[], &[]));
    assert!(result.unwrap_err().is_unknown_quorum());
    assert_eq!(errors, 1);
    assert!(cluster.calls().is_empty());

    deployment.shutdown().unwrap();
}

#[test]
fn departure_reconfigures_survivors_only() {
    let (mut deployment, cluster) = bootstrapped_recording(5, 1).unwrap();
    cluster.clear();

    deployment.depart(PeerIndex(0)).unwrap();

    let calls = cluster.calls();
    let releases: Vec<usize> = calls
        .iter()
        .filter(|c| c.op == "release")
        .map(|c| c.replica)
        .collect();
    assert_eq!(releases, vec![0, 1]);

    let updates: Vec<&Call> = calls.iter().filter(|c| c.op == "update_membership").collect();
    assert_eq!(updates.len(), 6);
    for call in updates {
        assert!(call.committee == CommitteeId(0) || call.committee == CommitteeId(1));
        assert!(call.replica > 1);
    }

    deployment.shutdown().unwrap();
}

#[test]
fn shutdown_releases_every_replica_once() {
    let (deployment, cluster) = bootstrapped_recording(4, 2).unwrap();
    let replicas = 2 * deployment.live_count();
    cluster.clear();

    deployment.shutdown().unwrap();

    let mut released: Vec<usize> = cluster
        .calls()
        .iter()
        .filter(|c| c.op == "release")
        .map(|c| c.replica)
        .collect();
    released.sort_unstable();
    assert_eq!(released, (0..replicas).collect::<Vec<_>>());
}
