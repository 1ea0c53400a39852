use std::sync::Arc;

use rendezvous_core::{DecodeError, RoomId, SessionDescriptor};
use rendezvous_signal::{DocumentStore, MemoryDocumentStore, NegotiationState, SignallingError};
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{MOCK_OFFER_SDP, TestSession};

#[tokio::test]
async fn test_join_missing_room_can_be_retried() {
    init_tracing();

    let store = MemoryDocumentStore::new();
    let callee = TestSession::spawn(Arc::new(store.clone()));
    let room = RoomId::from("no-such-room");

    let err = callee.handle.join_room(room.clone()).await.unwrap_err();
    assert_eq!(err, SignallingError::OfferNotFound(room.clone()));

    // Nothing was published yet; the session stays usable.
    let status = callee.handle.status();
    assert_eq!(status.state, NegotiationState::Idle);
    assert_eq!(status.error, None);
    assert!(callee.peer.calls().await.is_empty());

    let offer = SessionDescriptor::offer(MOCK_OFFER_SDP);
    store
        .set_field(room.as_str(), "offer", offer.to_value())
        .await
        .unwrap();

    callee.handle.join_room(room.clone()).await.unwrap();
    assert_eq!(callee.handle.status().state, NegotiationState::Negotiated);
    assert_eq!(callee.peer.remote_descriptions().await, vec![offer]);
    assert!(store.get_document(room.as_str()).await.unwrap().unwrap().contains_key("answer"));
}

#[tokio::test]
async fn test_join_room_without_offer_can_be_retried() {
    init_tracing();

    let store = MemoryDocumentStore::new();
    let room = RoomId(store.create_document().await.unwrap());
    let callee = TestSession::spawn(Arc::new(store.clone()));

    let err = callee.handle.join_room(room.clone()).await.unwrap_err();
    assert_eq!(err, SignallingError::OfferNotFound(room.clone()));
    assert_eq!(callee.handle.status().state, NegotiationState::Idle);

    // An exchange has no room to relay from until the join succeeds.
    assert!(matches!(
        callee.handle.begin_remote_candidate_exchange().await,
        Err(SignallingError::InvalidRole { role: None, .. })
    ));

    store
        .set_field(
            room.as_str(),
            "offer",
            SessionDescriptor::offer(MOCK_OFFER_SDP).to_value(),
        )
        .await
        .unwrap();

    callee.handle.join_room(room).await.unwrap();
    assert_eq!(callee.handle.status().state, NegotiationState::Negotiated);
    callee.handle.begin_remote_candidate_exchange().await.unwrap();
}

#[tokio::test]
async fn test_join_room_with_malformed_offer_fails() {
    init_tracing();

    let store = MemoryDocumentStore::new();
    let room = store.create_document().await.unwrap();
    store
        .set_field(&room, "offer", json!({ "type": "offer" }))
        .await
        .unwrap();
    let callee = TestSession::spawn(Arc::new(store));

    let err = callee.handle.join_room(RoomId(room)).await.unwrap_err();

    assert!(matches!(
        err,
        SignallingError::Decode(DecodeError::Malformed { .. })
    ));
    assert_eq!(callee.handle.status().state, NegotiationState::Failed);

    // A failed session refuses further work.
    assert!(matches!(
        callee.handle.begin_remote_candidate_exchange().await,
        Err(SignallingError::InvalidState { .. })
    ));
}
