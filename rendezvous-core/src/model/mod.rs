mod candidate;
mod decode_error;
mod document;
mod ice;
mod room;
mod session_descriptor;
mod store_message;

pub use candidate::Candidate;
pub use decode_error::DecodeError;
pub use document::{Document, RoomSnapshot};
pub use ice::IceServerConfig;
pub use room::{CandidateCollection, Role, RoomField, RoomId};
pub use session_descriptor::{SdpKind, SessionDescriptor};
pub use store_message::{StoreReply, StoreRequest};
