use rendezvous_core::Candidate;

/// Events a peer session reports to the signalling controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// The engine found a local network path; it must reach the other side.
    LocalCandidate(Candidate),

    TransportConnected,

    TransportFailed,
}
