use crate::model::{DecodeError, RoomField, SessionDescriptor};
use serde_json::{Map, Value};

/// Raw document as held by the store.
pub type Document = Map<String, Value>;

/// Decoded view of a room document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub offer: Option<SessionDescriptor>,
    pub answer: Option<SessionDescriptor>,
}

impl RoomSnapshot {
    /// Absent, `null`, `{}` and empty-`sdp` fields decode to `None`; anything
    /// else must match the descriptor shape.
    pub fn decode(document: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            offer: decode_field(document, RoomField::Offer)?,
            answer: decode_field(document, RoomField::Answer)?,
        })
    }
}

fn decode_field(
    document: &Document,
    field: RoomField,
) -> Result<Option<SessionDescriptor>, DecodeError> {
    match document.get(field.as_str()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => {
            let descriptor = SessionDescriptor::from_value(field, value)?;
            Ok((!descriptor.sdp.is_empty()).then_some(descriptor))
        }
    }
}
