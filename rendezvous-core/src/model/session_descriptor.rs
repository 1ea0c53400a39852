use crate::model::{DecodeError, RoomField};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

impl SdpKind {
    /// Room document field a description of this kind is stored under.
    pub fn field(self) -> RoomField {
        match self {
            SdpKind::Offer => RoomField::Offer,
            SdpKind::Answer => RoomField::Answer,
        }
    }
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpKind::Offer => f.write_str("offer"),
            SdpKind::Answer => f.write_str("answer"),
        }
    }
}

/// Session description exchanged through the room. The SDP payload is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescriptor {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }

    /// Wire shape: `{ "type": "offer" | "answer", "sdp": <string> }`.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": self.kind,
            "sdp": self.sdp,
        })
    }

    /// Strict decode of the value stored under `field`.
    ///
    /// The `type` tag must match the field it was read from.
    pub fn from_value(field: RoomField, value: &Value) -> Result<Self, DecodeError> {
        let descriptor =
            Self::deserialize(value).map_err(|e| DecodeError::Malformed {
                field: field.as_str().to_owned(),
                reason: e.to_string(),
            })?;

        if descriptor.kind.field() != field {
            return Err(DecodeError::KindMismatch {
                field: field.as_str().to_owned(),
                found: descriptor.kind,
            });
        }

        Ok(descriptor)
    }
}
