use async_trait::async_trait;
use rendezvous_core::{Candidate, RoomId, SessionDescriptor};

/// Notifications the controller raises towards the application layer.
///
/// These four calls are the whole observable output of a signalling
/// session; its negotiation state is exposed separately through
/// `SessionHandle::status`.
#[async_trait]
pub trait SignallingOutput: Send + Sync {
    async fn on_room_created(&self, room: RoomId);

    /// The remote offer was applied to the peer session.
    async fn on_offer_received(&self, offer: SessionDescriptor);

    /// The remote answer was applied to the peer session. Fires at most once.
    async fn on_answer_received(&self, answer: SessionDescriptor);

    async fn on_ice_candidate_received(&self, candidate: Candidate);
}
