use std::sync::Arc;

use rendezvous_core::{RoomId, RoomSnapshot, SessionDescriptor};
use rendezvous_signal::{
    DocumentStore, MemoryDocumentStore, NegotiationState, SignallingError, SignallingEvent,
};

use crate::integration::init_tracing;
use crate::utils::{MOCK_ANSWER_SDP, PeerCall, TestSession};

/// A room holding only an offer, as a caller would leave it.
async fn room_with_offer(store: &MemoryDocumentStore, offer: &SessionDescriptor) -> RoomId {
    let room = store.create_document().await.unwrap();
    store.set_field(&room, "offer", offer.to_value()).await.unwrap();
    RoomId(room)
}

#[tokio::test]
async fn test_callee_answers_offer() {
    init_tracing();

    let store = MemoryDocumentStore::new();
    let offer = SessionDescriptor::offer("v=0\r\ns=remote-offer\r\n");
    let room = room_with_offer(&store, &offer).await;

    let mut callee = TestSession::spawn(Arc::new(store.clone()));
    callee
        .handle
        .join_room(room.clone())
        .await
        .expect("Failed to join room");

    assert_eq!(callee.handle.status().state, NegotiationState::Negotiated);
    assert_eq!(
        callee.events.recv().await,
        Some(SignallingEvent::OfferReceived(offer.clone()))
    );

    // Offer applied before the answer is created.
    assert_eq!(
        callee.peer.calls().await,
        vec![PeerCall::SetRemote(offer.clone()), PeerCall::CreateAnswer]
    );

    let stored = RoomSnapshot::decode(&store.snapshot(room.as_str()).unwrap()).unwrap();
    assert_eq!(stored.offer, Some(offer));
    assert_eq!(stored.answer, Some(SessionDescriptor::answer(MOCK_ANSWER_SDP)));
}

#[tokio::test]
async fn test_second_answer_is_rejected_and_first_is_kept() {
    init_tracing();

    let store = MemoryDocumentStore::new();
    let room = room_with_offer(&store, &SessionDescriptor::offer("v=0")).await;

    let callee = TestSession::spawn(Arc::new(store.clone()));
    callee.handle.join_room(room.clone()).await.unwrap();

    let err = callee
        .handle
        .publish_local_answer(SessionDescriptor::answer("v=0\r\ns=another\r\n"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SignallingError::InvalidState {
            operation: "publish_local_answer",
            state: NegotiationState::Negotiated,
        }
    );

    let stored = RoomSnapshot::decode(&store.snapshot(room.as_str()).unwrap()).unwrap();
    assert_eq!(stored.answer, Some(SessionDescriptor::answer(MOCK_ANSWER_SDP)));
}

#[tokio::test]
async fn test_callee_cannot_publish_offer() {
    init_tracing();

    let store = MemoryDocumentStore::new();
    let room = room_with_offer(&store, &SessionDescriptor::offer("v=0")).await;

    let callee = TestSession::spawn(Arc::new(store.clone()));
    callee.handle.join_room(room).await.unwrap();

    let err = callee
        .handle
        .publish_local_offer(SessionDescriptor::offer("v=0"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SignallingError::InvalidRole {
            operation: "publish_local_offer",
            role: Some(rendezvous_core::Role::Callee),
        }
    ));
}

#[tokio::test]
async fn test_caller_cannot_publish_answer() {
    init_tracing();

    let caller = TestSession::spawn(Arc::new(MemoryDocumentStore::new()));
    caller.handle.create_room().await.unwrap();

    let err = caller
        .handle
        .publish_local_answer(SessionDescriptor::answer("v=0"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SignallingError::InvalidRole {
            operation: "publish_local_answer",
            role: Some(rendezvous_core::Role::Caller),
        }
    ));
    assert_eq!(caller.handle.status().state, NegotiationState::RoomPending);
}
