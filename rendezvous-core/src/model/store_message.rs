use crate::model::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requests sent by a remote store client over the store WebSocket.
///
/// `req` ids pair a request with exactly one reply; `watch` ids tag every
/// delivery of a live subscription until it is cancelled or fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum StoreRequest {
    Create {
        req: u64,
    },
    Get {
        req: u64,
        room: String,
    },
    SetField {
        req: u64,
        room: String,
        field: String,
        value: Value,
    },
    Append {
        req: u64,
        room: String,
        collection: String,
        document: Document,
    },
    WatchDocument {
        watch: u64,
        room: String,
    },
    WatchAdditions {
        watch: u64,
        room: String,
        collection: String,
    },
    Unwatch {
        watch: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum StoreReply {
    Created {
        req: u64,
        room: String,
    },
    Document {
        req: u64,
        document: Option<Document>,
    },
    Ack {
        req: u64,
    },
    Failed {
        req: u64,
        reason: String,
    },
    Snapshot {
        watch: u64,
        document: Document,
    },
    Added {
        watch: u64,
        document: Document,
    },
    /// Terminal event for a watch; no further deliveries follow.
    WatchFailed {
        watch: u64,
        reason: String,
    },
}
