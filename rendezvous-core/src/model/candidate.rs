use crate::model::{DecodeError, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One network path a peer may be reachable on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Candidate {
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: u32,
    pub candidate: String,
}

/// Stored shape. The line index is kept as a 64-bit integer by the store.
#[derive(Deserialize)]
struct StoredCandidate {
    candidate: String,
    #[serde(rename = "sdpMLineIndex")]
    sdp_m_line_index: i64,
    #[serde(rename = "sdpMid", default)]
    sdp_mid: Option<String>,
}

impl Candidate {
    pub fn new(
        candidate: impl Into<String>,
        sdp_mid: Option<String>,
        sdp_m_line_index: u32,
    ) -> Self {
        Self {
            sdp_mid,
            sdp_m_line_index,
            candidate: candidate.into(),
        }
    }

    /// Wire shape: `{ candidate, sdpMLineIndex, sdpMid }`.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert("candidate".to_owned(), Value::from(self.candidate.clone()));
        document.insert(
            "sdpMLineIndex".to_owned(),
            Value::from(i64::from(self.sdp_m_line_index)),
        );
        document.insert(
            "sdpMid".to_owned(),
            self.sdp_mid.clone().map_or(Value::Null, Value::from),
        );
        document
    }

    /// Strict decode of one sub-collection entry.
    pub fn from_document(document: &Document) -> Result<Self, DecodeError> {
        let stored: StoredCandidate = serde_json::from_value(Value::Object(document.clone()))
            .map_err(|e| DecodeError::Malformed {
                field: "candidate".to_owned(),
                reason: e.to_string(),
            })?;

        let sdp_m_line_index = u32::try_from(stored.sdp_m_line_index)
            .map_err(|_| DecodeError::IndexOutOfRange(stored.sdp_m_line_index))?;

        Ok(Self {
            sdp_mid: stored.sdp_mid,
            sdp_m_line_index,
            candidate: stored.candidate,
        })
    }
}
