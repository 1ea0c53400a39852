use std::sync::Arc;

use rendezvous_core::SessionDescriptor;
use rendezvous_signal::{DocumentStore, MemoryDocumentStore, NegotiationState, SignallingEvent};
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{MOCK_ANSWER_SDP, MOCK_OFFER_SDP, TestSession, settle};

#[tokio::test]
async fn test_empty_answer_fields_are_not_applied() {
    init_tracing();

    let store = MemoryDocumentStore::new();
    let caller = TestSession::spawn(Arc::new(store.clone()));
    let room = caller.handle.create_room().await.unwrap();
    caller
        .handle
        .publish_local_offer(SessionDescriptor::offer(MOCK_OFFER_SDP))
        .await
        .unwrap();

    for empty in [json!({}), json!({ "type": "answer", "sdp": "" })] {
        store
            .set_field(room.as_str(), "answer", empty)
            .await
            .unwrap();
        settle().await;

        let status = caller.handle.status();
        assert_eq!(status.state, NegotiationState::OfferSent);
        assert_eq!(status.error, None);
        assert!(caller.peer.remote_descriptions().await.is_empty());
    }

    // The real answer still goes through once it is written.
    let answer = SessionDescriptor::answer(MOCK_ANSWER_SDP);
    store
        .set_field(room.as_str(), "answer", answer.to_value())
        .await
        .unwrap();
    caller
        .wait_for_state(NegotiationState::Negotiated)
        .await
        .unwrap();

    assert_eq!(caller.peer.remote_descriptions().await, vec![answer.clone()]);
    assert_eq!(
        caller.output.get_events().await,
        vec![
            SignallingEvent::RoomCreated(room),
            SignallingEvent::AnswerReceived(answer),
        ]
    );
}
