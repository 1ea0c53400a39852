use crate::controller::NegotiationState;
use crate::store::StoreError;
use rendezvous_core::{DecodeError, Role, RoomId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignallingError {
    /// A one-shot store call failed. Not retried.
    #[error("room store unavailable: {0}")]
    StoreUnavailable(String),

    /// A live subscription ended with an error. Re-subscribing is up to the caller.
    #[error("room subscription failed: {0}")]
    Subscription(String),

    #[error("room {0} has no offer")]
    OfferNotFound(RoomId),

    #[error("`{operation}` is not allowed for role {role:?}")]
    InvalidRole {
        operation: &'static str,
        role: Option<Role>,
    },

    #[error("`{operation}` is not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: NegotiationState,
    },

    /// The peer session rejected a description or candidate.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("malformed room data: {0}")]
    Decode(#[from] DecodeError),

    /// The controller task is no longer running.
    #[error("signalling session closed")]
    SessionClosed,
}

impl From<StoreError> for SignallingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => SignallingError::StoreUnavailable(reason),
            StoreError::Subscription(reason) => SignallingError::Subscription(reason),
        }
    }
}

pub type Result<T, E = SignallingError> = std::result::Result<T, E>;
