use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque room identifier assigned by the document store.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of the room this session plays.
///
/// The caller creates the room and writes the offer, the callee joins an
/// existing room and writes the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Caller,
    Callee,
}

impl Role {
    /// Sub-collection this role appends its own candidates to.
    pub fn own_candidates(self) -> CandidateCollection {
        match self {
            Role::Caller => CandidateCollection::Caller,
            Role::Callee => CandidateCollection::Callee,
        }
    }

    /// Sub-collection written by the other side, observed but never written.
    pub fn remote_candidates(self) -> CandidateCollection {
        match self {
            Role::Caller => CandidateCollection::Callee,
            Role::Callee => CandidateCollection::Caller,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Caller => f.write_str("caller"),
            Role::Callee => f.write_str("callee"),
        }
    }
}

/// Description fields of the room document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomField {
    Offer,
    Answer,
}

impl RoomField {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomField::Offer => "offer",
            RoomField::Answer => "answer",
        }
    }
}

/// Append-only candidate sub-collections of the room document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateCollection {
    Caller,
    Callee,
}

impl CandidateCollection {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateCollection::Caller => "callerCandidates",
            CandidateCollection::Callee => "calleeCandidates",
        }
    }
}
