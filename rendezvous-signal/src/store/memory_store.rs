use crate::store::{DocumentStore, DocumentStream, StoreError, Watcher, receiver_stream};
use async_trait::async_trait;
use dashmap::DashMap;
use rendezvous_core::Document;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Default)]
struct StoredRoom {
    /// `None` until the document is created or a field is written.
    document: Option<Document>,
    collections: HashMap<String, Vec<Document>>,
    document_watchers: Vec<Watcher>,
    addition_watchers: HashMap<String, Vec<Watcher>>,
}

struct MemoryInner {
    rooms: DashMap<String, StoredRoom>,
    available: AtomicBool,
}

/// In-process document store.
///
/// Every watcher gets its own unbounded channel, registered under the same
/// map guard that replays the current state, so a subscriber never misses or
/// duplicates an entry no matter when it subscribes.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<MemoryInner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                rooms: DashMap::new(),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Make one-shot calls fail with `Unavailable` (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Terminate every live watch on a document with a subscription error.
    pub fn fail_watches(&self, id: &str, reason: &str) {
        let Some(mut room) = self.inner.rooms.get_mut(id) else {
            return;
        };
        let err = StoreError::Subscription(reason.to_owned());
        for watcher in room.document_watchers.drain(..) {
            let _ = watcher.send(Err(err.clone()));
        }
        for (_, watchers) in room.addition_watchers.drain() {
            for watcher in watchers {
                let _ = watcher.send(Err(err.clone()));
            }
        }
        warn!("Failed all watches on document {}: {}", id, reason);
    }

    /// Current document, bypassing availability.
    pub fn snapshot(&self, id: &str) -> Option<Document> {
        self.inner.rooms.get(id).and_then(|room| room.document.clone())
    }

    /// Entries of a sub-collection in insertion order, bypassing availability.
    pub fn entries(&self, id: &str, collection: &str) -> Vec<Document> {
        self.inner
            .rooms
            .get(id)
            .and_then(|room| room.collections.get(collection).cloned())
            .unwrap_or_default()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_owned()))
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn notify(watchers: &mut Vec<Watcher>, document: &Document) {
    watchers.retain(|watcher| watcher.send(Ok(document.clone())).is_ok());
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document(&self) -> Result<String, StoreError> {
        self.ensure_available()?;

        let id = Uuid::new_v4().to_string();
        self.inner.rooms.insert(
            id.clone(),
            StoredRoom {
                document: Some(Document::new()),
                ..Default::default()
            },
        );
        debug!("Created document {}", id);
        Ok(id)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.ensure_available()?;
        Ok(self.snapshot(id))
    }

    async fn set_field(&self, id: &str, field: &str, value: Value) -> Result<(), StoreError> {
        self.ensure_available()?;

        let mut room = self.inner.rooms.entry(id.to_owned()).or_default();
        let room = &mut *room;
        let document = room.document.get_or_insert_with(Document::new);
        document.insert(field.to_owned(), value);

        let document = document.clone();
        notify(&mut room.document_watchers, &document);
        Ok(())
    }

    async fn append(&self, id: &str, collection: &str, entry: Document) -> Result<(), StoreError> {
        self.ensure_available()?;

        let mut room = self.inner.rooms.entry(id.to_owned()).or_default();
        let room = &mut *room;
        if let Some(watchers) = room.addition_watchers.get_mut(collection) {
            notify(watchers, &entry);
        }
        room.collections
            .entry(collection.to_owned())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn watch_document(&self, id: &str) -> Result<DocumentStream, StoreError> {
        self.ensure_available()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut room = self.inner.rooms.entry(id.to_owned()).or_default();
        if let Some(document) = &room.document {
            let _ = tx.send(Ok(document.clone()));
        }
        room.document_watchers.push(tx);
        Ok(receiver_stream(rx))
    }

    async fn watch_additions(
        &self,
        id: &str,
        collection: &str,
    ) -> Result<DocumentStream, StoreError> {
        self.ensure_available()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut room = self.inner.rooms.entry(id.to_owned()).or_default();
        let room = &mut *room;
        for entry in room.collections.get(collection).into_iter().flatten() {
            let _ = tx.send(Ok(entry.clone()));
        }
        room.addition_watchers
            .entry(collection.to_owned())
            .or_default()
            .push(tx);
        Ok(receiver_stream(rx))
    }
}
