//! Tests for mirrored object-store targets.

use std::sync::Arc;
use uploadfs_error::{ReplicaErrorKind, UploadfsErrorKind};
use uploadfs_storage::{BackendTarget, MemoryObjectClient, ObjectClient, PutOptions, ReplicaSet};

fn targets(n: usize) -> Vec<Arc<MemoryObjectClient>> {
    (1..=n)
        .map(|i| {
            Arc::new(MemoryObjectClient::new(BackendTarget::new(
                format!("acct{}", i),
                "media",
            )))
        })
        .collect()
}

fn set(clients: &[Arc<MemoryObjectClient>]) -> ReplicaSet {
    ReplicaSet::new(
        clients
            .iter()
            .map(|c| Arc::clone(c) as Arc<dyn ObjectClient>)
            .collect(),
    )
    .unwrap()
}

fn replica_kind(err: &uploadfs_error::UploadfsError) -> &ReplicaErrorKind {
    match err.kind() {
        UploadfsErrorKind::Replica(e) => &e.kind,
        other => panic!("expected replica error, got {}", other),
    }
}

#[test]
fn test_empty_set_rejected() {
    assert!(ReplicaSet::new(Vec::new()).is_err());
}

#[tokio::test]
async fn test_put_with_one_target_offline() {
    let clients = targets(3);
    let replicas = set(&clients);
    clients[1].set_offline(true);

    let err = replicas
        .put("a.txt", b"data".to_vec(), &PutOptions::default())
        .await
        .unwrap_err();
    match replica_kind(&err) {
        ReplicaErrorKind::Failed { failures, .. } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].target, "acct2/media");
        }
        other => panic!("unexpected {}", other),
    }

    clients[1].set_offline(false);
    assert!(clients[0].object("a.txt").is_some());
    assert!(clients[1].object("a.txt").is_none());
    assert!(clients[2].object("a.txt").is_some());
}

#[tokio::test]
async fn test_get_fails_over_in_order() {
    let clients = targets(2);
    let replicas = set(&clients);
    clients[1]
        .put("a.txt", b"second".to_vec(), &PutOptions::default())
        .await
        .unwrap();

    let fetched = replicas.get("a.txt").await.unwrap();
    assert_eq!(fetched.body, b"second");

    clients[0]
        .put("a.txt", b"first".to_vec(), &PutOptions::default())
        .await
        .unwrap();
    assert_eq!(replicas.get("a.txt").await.unwrap().body, b"first");
}

#[tokio::test]
async fn test_get_missing_everywhere_is_not_found() {
    let clients = targets(2);
    let replicas = set(&clients);
    assert!(replicas.get("nope").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_get_exhausted_when_any_failure_is_not_missing() {
    let clients = targets(2);
    let replicas = set(&clients);
    clients[0].set_offline(true);

    let err = replicas.get("nope").await.unwrap_err();
    assert!(!err.is_not_found());
    match replica_kind(&err) {
        ReplicaErrorKind::Exhausted { failures, .. } => assert_eq!(failures.len(), 2),
        other => panic!("unexpected {}", other),
    }
}

#[tokio::test]
async fn test_rename_refuses_diverged_replicas() {
    let clients = targets(3);
    let replicas = set(&clients);
    for client in [&clients[0], &clients[2]] {
        client
            .put("a.txt", b"x".to_vec(), &PutOptions::default())
            .await
            .unwrap();
    }

    let err = replicas.rename("disable", "a.txt", "b.txt").await.unwrap_err();
    match replica_kind(&err) {
        ReplicaErrorKind::Diverged { targets, .. } => assert_eq!(targets, &["acct2/media"]),
        other => panic!("unexpected {}", other),
    }
    assert!(clients[0].object("a.txt").is_some());
    assert!(clients[0].object("b.txt").is_none());
}

#[tokio::test]
async fn test_rename_moves_on_every_replica() {
    let clients = targets(2);
    let replicas = set(&clients);
    replicas
        .put("a.txt", b"x".to_vec(), &PutOptions::default())
        .await
        .unwrap();

    replicas.rename("disable", "a.txt", "b.txt").await.unwrap();
    for client in &clients {
        assert_eq!(client.keys(), vec!["b.txt"]);
    }
    assert!(
        replicas
            .rename("disable", "a.txt", "b.txt")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_single_target_errors_pass_through() {
    let client = Arc::new(MemoryObjectClient::new(BackendTarget::new("a", "b")));
    let replicas = ReplicaSet::single(client);
    assert!(replicas.delete("nope").await.unwrap_err().is_not_found());
}
