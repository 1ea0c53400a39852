use std::sync::Arc;

use rendezvous_core::{CandidateCollection, SessionDescriptor};
use rendezvous_signal::{DocumentStore, MemoryDocumentStore, NegotiationState, SignallingError};

use crate::integration::init_tracing;
use crate::utils::{TestSession, host_candidate, settle};

#[tokio::test]
async fn test_close_cancels_subscriptions_and_peer() {
    init_tracing();

    let store = MemoryDocumentStore::new();
    let caller = TestSession::spawn(Arc::new(store.clone()));
    let room = caller.handle.create_room().await.unwrap();
    caller
        .handle
        .publish_local_offer(SessionDescriptor::offer("v=0"))
        .await
        .unwrap();
    caller.handle.begin_remote_candidate_exchange().await.unwrap();
    let status = caller.handle.clone();

    caller.handle.close().await.expect("Failed to close session");

    assert!(caller.peer.is_closed().await);
    assert_eq!(status.status().state, NegotiationState::Closed);

    // Nothing reaches the closed session any more.
    store
        .append(
            room.as_str(),
            CandidateCollection::Callee.as_str(),
            host_candidate(1).to_document(),
        )
        .await
        .unwrap();
    store
        .set_field(
            room.as_str(),
            "answer",
            SessionDescriptor::answer("v=0").to_value(),
        )
        .await
        .unwrap();
    settle().await;

    assert!(caller.peer.remote_candidates().await.is_empty());
    assert!(caller.peer.remote_descriptions().await.is_empty());
    assert_eq!(
        caller.handle.create_room().await,
        Err(SignallingError::SessionClosed)
    );
}

#[tokio::test]
async fn test_dropping_every_handle_closes_session() {
    init_tracing();

    let caller = TestSession::spawn(Arc::new(MemoryDocumentStore::new()));
    caller.handle.create_room().await.unwrap();

    let peer = caller.peer.clone();
    drop(caller);

    let start = std::time::Instant::now();
    while !peer.is_closed().await {
        assert!(
            start.elapsed() < std::time::Duration::from_secs(5),
            "Peer session was never closed"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
