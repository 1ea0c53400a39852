use crate::model::SdpKind;
use thiserror::Error;

/// A stored value does not have the shape the room contract requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("field `{field}` is malformed: {reason}")]
    Malformed { field: String, reason: String },

    #[error("field `{field}` holds a description of kind `{found}`")]
    KindMismatch { field: String, found: SdpKind },

    #[error("sdpMLineIndex {0} does not fit a 32-bit index")]
    IndexOutOfRange(i64),
}
