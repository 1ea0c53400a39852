use std::sync::Arc;

use futures::StreamExt;
use rendezvous_core::Document;
use rendezvous_signal::{DocumentStore, MemoryDocumentStore, RemoteDocumentStore, StoreError};
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::start_store_server;

fn entry(n: i64) -> Document {
    let mut doc = Document::new();
    doc.insert("n".into(), json!(n));
    doc
}

#[tokio::test]
async fn test_remote_store_reads_and_writes() {
    init_tracing();

    let backing = MemoryDocumentStore::new();
    let url = start_store_server(Arc::new(backing.clone())).await;
    let remote = RemoteDocumentStore::connect(&url).await.expect("Failed to connect");

    let id = remote.create_document().await.unwrap();
    remote.set_field(&id, "offer", json!({ "sdp": "o" })).await.unwrap();
    remote.append(&id, "callerCandidates", entry(1)).await.unwrap();

    let doc = remote.get_document(&id).await.unwrap().unwrap();
    assert_eq!(doc.get("offer"), Some(&json!({ "sdp": "o" })));
    assert_eq!(backing.entries(&id, "callerCandidates"), vec![entry(1)]);
    assert_eq!(remote.get_document("missing").await, Ok(None));
}

#[tokio::test]
async fn test_remote_watch_replays_then_follows() {
    init_tracing();

    let backing = MemoryDocumentStore::new();
    let url = start_store_server(Arc::new(backing.clone())).await;
    let remote = RemoteDocumentStore::connect(&url).await.unwrap();
    let id = remote.create_document().await.unwrap();

    remote.append(&id, "c", entry(1)).await.unwrap();
    let mut additions = remote.watch_additions(&id, "c").await.unwrap();
    remote.append(&id, "c", entry(2)).await.unwrap();

    assert_eq!(additions.next().await, Some(Ok(entry(1))));
    assert_eq!(additions.next().await, Some(Ok(entry(2))));

    backing.fail_watches(&id, "gone");
    assert_eq!(
        additions.next().await,
        Some(Err(StoreError::Subscription("gone".to_owned())))
    );
}

#[tokio::test]
async fn test_remote_store_reports_backing_outage() {
    init_tracing();

    let backing = MemoryDocumentStore::new();
    let url = start_store_server(Arc::new(backing.clone())).await;
    let remote = RemoteDocumentStore::connect(&url).await.unwrap();

    backing.set_available(false);
    assert!(matches!(
        remote.create_document().await,
        Err(StoreError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_connect_to_nothing_is_unavailable() {
    init_tracing();

    let err = RemoteDocumentStore::connect("ws://127.0.0.1:1/store")
        .await
        .err()
        .expect("Connected to a closed port");
    assert!(matches!(err, StoreError::Unavailable(_)));
}
