use crate::error::{Result, SignallingError};
use crate::store::{DocumentStore, StoreError};
use futures::StreamExt;
use futures::stream::BoxStream;
use rendezvous_core::{
    Candidate, CandidateCollection, DecodeError, RoomField, RoomId, RoomSnapshot,
    SessionDescriptor,
};
use std::sync::Arc;

pub type SnapshotStream = BoxStream<'static, Result<RoomSnapshot>>;
pub type CandidateStream = BoxStream<'static, Result<Candidate>>;

/// Typed view of the room contract on top of a [`DocumentStore`].
#[derive(Clone)]
pub struct RoomClient {
    store: Arc<dyn DocumentStore>,
}

impl RoomClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self) -> Result<RoomId> {
        let id = self.store.create_document().await?;
        Ok(RoomId(id))
    }

    pub async fn get(&self, room: &RoomId) -> Result<Option<RoomSnapshot>> {
        let Some(document) = self.store.get_document(room.as_str()).await? else {
            return Ok(None);
        };
        Ok(Some(RoomSnapshot::decode(&document)?))
    }

    pub async fn set_field(
        &self,
        room: &RoomId,
        field: RoomField,
        descriptor: &SessionDescriptor,
    ) -> Result<()> {
        if descriptor.kind.field() != field {
            return Err(DecodeError::KindMismatch {
                field: field.as_str().to_owned(),
                found: descriptor.kind,
            }
            .into());
        }

        self.store
            .set_field(room.as_str(), field.as_str(), descriptor.to_value())
            .await?;
        Ok(())
    }

    pub async fn add_to_subcollection(
        &self,
        room: &RoomId,
        collection: CandidateCollection,
        candidate: &Candidate,
    ) -> Result<()> {
        self.store
            .append(room.as_str(), collection.as_str(), candidate.to_document())
            .await?;
        Ok(())
    }

    /// Decoded snapshots of the room document, current state first.
    pub async fn subscribe_document(&self, room: &RoomId) -> Result<SnapshotStream> {
        let feed = self.store.watch_document(room.as_str()).await?;
        Ok(feed
            .map(|item| match item {
                Ok(document) => RoomSnapshot::decode(&document).map_err(SignallingError::from),
                Err(err) => Err(feed_error(err)),
            })
            .boxed())
    }

    /// Decoded candidates added to `collection`, existing entries first.
    pub async fn subscribe_subcollection_additions(
        &self,
        room: &RoomId,
        collection: CandidateCollection,
    ) -> Result<CandidateStream> {
        let feed = self
            .store
            .watch_additions(room.as_str(), collection.as_str())
            .await?;
        Ok(feed
            .map(|item| match item {
                Ok(document) => Candidate::from_document(&document).map_err(SignallingError::from),
                Err(err) => Err(feed_error(err)),
            })
            .boxed())
    }
}

/// Whatever ends a live feed is a subscription failure.
fn feed_error(err: StoreError) -> SignallingError {
    match err {
        StoreError::Unavailable(reason) | StoreError::Subscription(reason) => {
            SignallingError::Subscription(reason)
        }
    }
}
