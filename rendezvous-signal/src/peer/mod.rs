mod peer_config;
mod peer_event;
mod peer_session;
mod webrtc_session;

pub use peer_config::*;
pub use peer_event::*;
pub use peer_session::*;
pub use webrtc_session::*;
