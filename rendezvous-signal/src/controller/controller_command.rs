use crate::error::Result;
use rendezvous_core::{RoomId, SessionDescriptor};
use tokio::sync::oneshot;

/// Commands sent to a running controller by its `SessionHandle`.
#[derive(Debug)]
pub enum ControllerCommand {
    /// Create a room and take the caller role.
    CreateRoom { reply: oneshot::Sender<Result<RoomId>> },

    /// Join an existing room as callee and answer its offer.
    JoinRoom {
        room: RoomId,
        reply: oneshot::Sender<Result<()>>,
    },

    PublishLocalOffer {
        offer: SessionDescriptor,
        reply: oneshot::Sender<Result<()>>,
    },

    PublishLocalAnswer {
        answer: SessionDescriptor,
        reply: oneshot::Sender<Result<()>>,
    },

    /// Start relaying the other side's candidates to the peer session.
    BeginRemoteCandidateExchange { reply: oneshot::Sender<Result<()>> },

    /// Cancel subscriptions, release the peer session and stop.
    Close { reply: oneshot::Sender<Result<()>> },
}
