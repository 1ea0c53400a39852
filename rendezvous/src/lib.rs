pub use rendezvous_core::model::{Candidate, Role, RoomId, SessionDescriptor};

pub mod model {
    pub use rendezvous_core::model::*;
}

#[cfg(feature = "signal")]
pub mod signal {
    pub use rendezvous_signal::*;
}
