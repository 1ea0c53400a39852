use std::sync::Arc;

use rendezvous_core::{RoomSnapshot, SdpKind, SessionDescriptor};
use rendezvous_signal::{
    DocumentStore, MemoryDocumentStore, NegotiationState, PeerSession, SignallingEvent,
};

use crate::integration::init_tracing;
use crate::utils::{MOCK_OFFER_SDP, TestSession};

#[tokio::test]
async fn test_caller_publishes_offer_and_applies_answer() {
    init_tracing();

    let store = MemoryDocumentStore::new();
    let mut caller = TestSession::spawn(Arc::new(store.clone()));

    let room = caller.handle.create_room().await.expect("Failed to create room");
    assert_eq!(caller.handle.status().state, NegotiationState::RoomPending);
    assert_eq!(
        caller.events.recv().await,
        Some(SignallingEvent::RoomCreated(room.clone()))
    );

    let offer = caller.peer.create_local_offer().await.unwrap();
    caller
        .handle
        .publish_local_offer(offer.clone())
        .await
        .expect("Failed to publish offer");
    assert_eq!(caller.handle.status().state, NegotiationState::OfferSent);

    let stored = RoomSnapshot::decode(&store.snapshot(room.as_str()).unwrap()).unwrap();
    assert_eq!(stored.offer, Some(SessionDescriptor::offer(MOCK_OFFER_SDP)));
    assert_eq!(stored.answer, None);

    // The callee writes its answer into the room document.
    let answer = SessionDescriptor::answer("v=0\r\ns=remote-answer\r\n");
    store
        .set_field(room.as_str(), "answer", answer.to_value())
        .await
        .unwrap();

    caller
        .wait_for_state(NegotiationState::Negotiated)
        .await
        .expect("Caller never negotiated");

    assert_eq!(
        caller.events.recv().await,
        Some(SignallingEvent::AnswerReceived(answer.clone()))
    );
    assert_eq!(caller.peer.remote_descriptions().await, vec![answer]);
    assert!(
        caller
            .peer
            .remote_descriptions()
            .await
            .iter()
            .all(|d| d.kind == SdpKind::Answer)
    );
}
