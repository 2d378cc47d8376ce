//! Several daemons converging through an in-process federation

use arbor_spec::ContentHash;
use arbor_sync::{
    DaemonConfig, LocalFederation, NodeId, SyncDaemon, SyncHandle, SyncHealth,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn start(federation: &LocalFederation, node: &str) -> SyncHandle {
    let handle = SyncDaemon::new(
        DaemonConfig::new(node),
        Arc::new(federation.clone()),
        Arc::new(federation.discovery_for(node)),
    )
    .spawn();
    federation.join(handle.clone());
    handle
}

/// Poll until `spec` on `handle` reaches `checksum`
async fn converged(handle: &SyncHandle, spec: &str, checksum: ContentHash) -> bool {
    for _ in 0..200 {
        if handle
            .records()
            .await
            .get(spec)
            .is_some_and(|known| known.record.checksum == checksum)
        {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

async fn federation_of(nodes: &[&str]) -> (LocalFederation, Vec<SyncHandle>) {
    let federation = LocalFederation::new();
    let handles: Vec<_> = nodes.iter().map(|n| start(&federation, n)).collect();
    // Members that started before the others joined must rediscover them
    for handle in &handles {
        handle.health_check().await.unwrap();
    }
    (federation, handles)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn local_change_reaches_every_node() {
    let (_federation, handles) = federation_of(&["a", "b", "c"]).await;
    let checksum = ContentHash::compute(b"auth v2");

    handles[0].local_change("auth", checksum).await.unwrap();

    for handle in &handles[1..] {
        assert!(converged(handle, "auth", checksum).await, "{}", handle.node_id());
        let known = &handle.records().await["auth"];
        assert_eq!(known.record.source_node, NodeId::from("a"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn later_announcement_wins_everywhere() {
    let (_federation, handles) = federation_of(&["a", "b"]).await;
    let first = ContentHash::compute(b"v1");
    let second = ContentHash::compute(b"v2");

    handles[0].local_change("billing", first).await.unwrap();
    assert!(converged(&handles[1], "billing", first).await);

    handles[1].local_change("billing", second).await.unwrap();
    assert!(converged(&handles[0], "billing", second).await);

    let on_a = &handles[0].records().await["billing"];
    assert_eq!(on_a.superseded, [first]);
    assert_eq!(on_a.record.source_node, NodeId::from("b"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn departed_member_is_dropped_on_health_check() {
    let (federation, handles) = federation_of(&["a", "b", "c"]).await;
    assert_eq!(handles[0].status().await.peer_count, 2);

    handles[2].shutdown().await;
    federation.leave(&NodeId::from("c"));
    handles[0].health_check().await.unwrap();

    let status = handles[0].status().await;
    assert_eq!(status.peer_count, 1);
    assert_eq!(status.health, SyncHealth::Healthy);
    assert_eq!(handles[0].peers().await, [NodeId::from("b")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stopped_member_reports_disconnected() {
    let (_federation, handles) = federation_of(&["a"]).await;
    handles[0].shutdown().await;

    for _ in 0..100 {
        if handles[0].is_closed() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(handles[0].status().await.health, SyncHealth::Disconnected);
}
