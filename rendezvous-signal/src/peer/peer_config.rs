use rendezvous_core::IceServerConfig;

/// Configuration for the WebRTC peer session.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun([
                "stun:stun1.l.google.com:19302",
                "stun:stun2.l.google.com:19302",
            ])],
        }
    }
}
