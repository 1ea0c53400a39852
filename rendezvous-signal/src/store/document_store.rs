use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use rendezvous_core::Document;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A one-shot call could not reach the store.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A live subscription failed. Always the last item of its stream.
    #[error("subscription failed: {0}")]
    Subscription(String),
}

impl StoreError {
    pub fn reason(&self) -> &str {
        match self {
            StoreError::Unavailable(reason) | StoreError::Subscription(reason) => reason,
        }
    }
}

/// Live feed of documents. An `Err` item is terminal.
pub type DocumentStream = BoxStream<'static, Result<Document, StoreError>>;

pub(crate) type Watcher = mpsc::UnboundedSender<Result<Document, StoreError>>;

/// Untyped document store holding room documents and their sub-collections.
///
/// Implementations must deliver the current state first on every watch:
/// the current snapshot for `watch_document` (when the document exists) and
/// every entry already present for `watch_additions`.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Create an empty document and return its store-assigned id.
    async fn create_document(&self) -> Result<String, StoreError>;

    /// One-shot read. A missing document is `Ok(None)`, not an error.
    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merge a single top-level field into the document, creating it if needed.
    async fn set_field(&self, id: &str, field: &str, value: Value) -> Result<(), StoreError>;

    /// Append an entry to a sub-collection of the document.
    async fn append(&self, id: &str, collection: &str, entry: Document) -> Result<(), StoreError>;

    async fn watch_document(&self, id: &str) -> Result<DocumentStream, StoreError>;

    /// Additions to a sub-collection. Updates and removals never surface.
    async fn watch_additions(&self, id: &str, collection: &str)
    -> Result<DocumentStream, StoreError>;
}

pub(crate) fn receiver_stream(
    rx: mpsc::UnboundedReceiver<Result<Document, StoreError>>,
) -> DocumentStream {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}
