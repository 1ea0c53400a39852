use crate::signaling::SignallingOutput;
use async_trait::async_trait;
use rendezvous_core::{Candidate, RoomId, SessionDescriptor};
use tokio::sync::mpsc;
use tracing::debug;

/// Owned form of a [`SignallingOutput`] notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignallingEvent {
    RoomCreated(RoomId),
    OfferReceived(SessionDescriptor),
    AnswerReceived(SessionDescriptor),
    IceCandidateReceived(Candidate),
}

/// Forwards every notification into an unbounded channel, for UI layers
/// that consume events from their own loop.
#[derive(Clone)]
pub struct ChannelOutput {
    tx: mpsc::UnboundedSender<SignallingEvent>,
}

impl ChannelOutput {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SignallingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: SignallingEvent) {
        if self.tx.send(event).is_err() {
            debug!("Signalling event dropped, receiver is gone");
        }
    }
}

#[async_trait]
impl SignallingOutput for ChannelOutput {
    async fn on_room_created(&self, room: RoomId) {
        self.emit(SignallingEvent::RoomCreated(room));
    }

    async fn on_offer_received(&self, offer: SessionDescriptor) {
        self.emit(SignallingEvent::OfferReceived(offer));
    }

    async fn on_answer_received(&self, answer: SessionDescriptor) {
        self.emit(SignallingEvent::AnswerReceived(answer));
    }

    async fn on_ice_candidate_received(&self, candidate: Candidate) {
        self.emit(SignallingEvent::IceCandidateReceived(candidate));
    }
}
