use crate::error::SignallingError;

/// Negotiation progress of one signalling session.
///
/// Caller: `Idle -> RoomPending -> OfferSent -> Negotiated`.
/// Callee: `Idle -> HasRemoteOffer -> Negotiated`.
/// `Connected` follows once the peer session reports its transport up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    RoomPending,
    OfferSent,
    HasRemoteOffer,
    /// Local and remote descriptions are both set.
    Negotiated,
    Connected,
    Failed,
    Closed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Failed | NegotiationState::Closed)
    }
}

/// What a session handle observes: the state, plus the cause once `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub state: NegotiationState,
    pub error: Option<SignallingError>,
}
