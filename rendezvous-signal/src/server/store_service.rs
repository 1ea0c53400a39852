use crate::server::ws_handler;
use crate::store::{DocumentStore, StoreError};
use axum::Router;
use axum::routing::get;
use rendezvous_core::{StoreReply, StoreRequest};
use std::sync::Arc;
use tracing::debug;

/// Serves a [`DocumentStore`] to `RemoteDocumentStore` clients.
#[derive(Clone)]
pub struct StoreService {
    store: Arc<dyn DocumentStore>,
}

impl StoreService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    /// Answer a one-shot request. Watch requests are handled by the socket.
    pub async fn execute(&self, request: StoreRequest) -> Option<StoreReply> {
        let reply = match request {
            StoreRequest::Create { req } => match self.store.create_document().await {
                Ok(room) => StoreReply::Created { req, room },
                Err(e) => failed(req, e),
            },
            StoreRequest::Get { req, room } => match self.store.get_document(&room).await {
                Ok(document) => StoreReply::Document { req, document },
                Err(e) => failed(req, e),
            },
            StoreRequest::SetField {
                req,
                room,
                field,
                value,
            } => match self.store.set_field(&room, &field, value).await {
                Ok(()) => StoreReply::Ack { req },
                Err(e) => failed(req, e),
            },
            StoreRequest::Append {
                req,
                room,
                collection,
                document,
            } => match self.store.append(&room, &collection, document).await {
                Ok(()) => StoreReply::Ack { req },
                Err(e) => failed(req, e),
            },
            StoreRequest::WatchDocument { .. }
            | StoreRequest::WatchAdditions { .. }
            | StoreRequest::Unwatch { .. } => return None,
        };
        Some(reply)
    }
}

fn failed(req: u64, err: StoreError) -> StoreReply {
    debug!("Store request {} failed: {}", req, err);
    StoreReply::Failed {
        req,
        reason: err.reason().to_owned(),
    }
}

/// Router exposing the store WebSocket at `/store`.
pub fn store_router(service: StoreService) -> Router {
    Router::new()
        .route("/store", get(ws_handler))
        .with_state(service)
}
