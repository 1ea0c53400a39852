use crate::store::{DocumentStore, DocumentStream, StoreError, Watcher};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::Stream;
use futures::{SinkExt, StreamExt};
use rendezvous_core::{Document, StoreReply, StoreRequest};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Reply routing shared with the socket reader task.
struct Routes {
    pending: DashMap<u64, oneshot::Sender<StoreReply>>,
    watches: DashMap<u64, Watcher>,
    connected: AtomicBool,
}

impl Routes {
    fn route(&self, reply: StoreReply) {
        match reply {
            StoreReply::Snapshot { watch, document } | StoreReply::Added { watch, document } => {
                let delivered = self
                    .watches
                    .get(&watch)
                    .is_some_and(|watcher| watcher.send(Ok(document)).is_ok());
                if !delivered {
                    self.watches.remove(&watch);
                }
            }
            StoreReply::WatchFailed { watch, reason } => {
                if let Some((_, watcher)) = self.watches.remove(&watch) {
                    let _ = watcher.send(Err(StoreError::Subscription(reason)));
                }
            }
            StoreReply::Created { req, .. }
            | StoreReply::Document { req, .. }
            | StoreReply::Ack { req }
            | StoreReply::Failed { req, .. } => match self.pending.remove(&req) {
                Some((_, reply_tx)) => {
                    let _ = reply_tx.send(reply);
                }
                None => warn!("Reply for unknown request {}", req),
            },
        }
    }

    /// Fail everything in flight once the socket is gone.
    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.pending.clear();

        let watches: Vec<u64> = self.watches.iter().map(|entry| *entry.key()).collect();
        for watch in watches {
            if let Some((_, watcher)) = self.watches.remove(&watch) {
                let _ = watcher.send(Err(StoreError::Subscription(
                    "store connection closed".to_owned(),
                )));
            }
        }
    }
}

struct RemoteInner {
    request_tx: mpsc::UnboundedSender<StoreRequest>,
    next_id: AtomicU64,
    routes: Arc<Routes>,
}

/// [`DocumentStore`] served by a remote store service over one WebSocket.
///
/// Requests and watches are multiplexed on the connection. Writes go out in
/// call order, which keeps candidate sub-collections in discovery order.
#[derive(Clone)]
pub struct RemoteDocumentStore {
    inner: Arc<RemoteInner>,
}

impl RemoteDocumentStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("connect to {url}: {e}")))?;
        info!("Connected to room store at {}", url);

        let (mut sink, mut stream) = socket.split();
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<StoreRequest>();
        let routes = Arc::new(Routes {
            pending: DashMap::new(),
            watches: DashMap::new(),
            connected: AtomicBool::new(true),
        });

        tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let json = match serde_json::to_string(&request) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize store request: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    error!("Failed to send store request: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_routes = routes.clone();
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<StoreReply>(&text) {
                        Ok(reply) => reader_routes.route(reply),
                        Err(e) => warn!("Invalid store reply: {:?}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Room store connection error: {}", e);
                        break;
                    }
                }
            }
            reader_routes.disconnect();
            info!("Room store connection closed");
        });

        Ok(Self {
            inner: Arc::new(RemoteInner {
                request_tx,
                next_id: AtomicU64::new(1),
                routes,
            }),
        })
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(
        &self,
        build: impl FnOnce(u64) -> StoreRequest,
    ) -> Result<StoreReply, StoreError> {
        let req = self.next_id();
        let (reply_tx, reply_rx) = oneshot::channel();
        let routes = &self.inner.routes;

        routes.pending.insert(req, reply_tx);
        if !routes.connected.load(Ordering::SeqCst)
            || self.inner.request_tx.send(build(req)).is_err()
        {
            routes.pending.remove(&req);
            return Err(closed());
        }

        match reply_rx.await {
            Ok(StoreReply::Failed { reason, .. }) => Err(StoreError::Unavailable(reason)),
            Ok(reply) => Ok(reply),
            Err(_) => Err(closed()),
        }
    }

    async fn watch(
        &self,
        build: impl FnOnce(u64) -> StoreRequest,
    ) -> Result<DocumentStream, StoreError> {
        let watch = self.next_id();
        let (tx, rx) = mpsc::unbounded_channel();
        let routes = &self.inner.routes;

        routes.watches.insert(watch, tx);
        if !routes.connected.load(Ordering::SeqCst)
            || self.inner.request_tx.send(build(watch)).is_err()
        {
            routes.watches.remove(&watch);
            return Err(closed());
        }

        debug!("Opened remote watch {}", watch);
        Ok(RemoteWatch {
            watch,
            rx,
            inner: self.inner.clone(),
        }
        .boxed())
    }
}

fn closed() -> StoreError {
    StoreError::Unavailable("store connection closed".to_owned())
}

fn unexpected(reply: StoreReply) -> StoreError {
    StoreError::Unavailable(format!("unexpected store reply: {reply:?}"))
}

/// Live feed of one remote watch. Dropping it cancels the watch server-side.
struct RemoteWatch {
    watch: u64,
    rx: mpsc::UnboundedReceiver<Result<Document, StoreError>>,
    inner: Arc<RemoteInner>,
}

impl Stream for RemoteWatch {
    type Item = Result<Document, StoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for RemoteWatch {
    fn drop(&mut self) {
        if self.inner.routes.watches.remove(&self.watch).is_some() {
            let _ = self
                .inner
                .request_tx
                .send(StoreRequest::Unwatch { watch: self.watch });
        }
    }
}

#[async_trait]
impl DocumentStore for RemoteDocumentStore {
    async fn create_document(&self) -> Result<String, StoreError> {
        match self.request(|req| StoreRequest::Create { req }).await? {
            StoreReply::Created { room, .. } => Ok(room),
            other => Err(unexpected(other)),
        }
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let room = id.to_owned();
        match self.request(|req| StoreRequest::Get { req, room }).await? {
            StoreReply::Document { document, .. } => Ok(document),
            other => Err(unexpected(other)),
        }
    }

    async fn set_field(&self, id: &str, field: &str, value: Value) -> Result<(), StoreError> {
        let (room, field) = (id.to_owned(), field.to_owned());
        match self
            .request(|req| StoreRequest::SetField {
                req,
                room,
                field,
                value,
            })
            .await?
        {
            StoreReply::Ack { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn append(&self, id: &str, collection: &str, entry: Document) -> Result<(), StoreError> {
        let (room, collection) = (id.to_owned(), collection.to_owned());
        match self
            .request(|req| StoreRequest::Append {
                req,
                room,
                collection,
                document: entry,
            })
            .await?
        {
            StoreReply::Ack { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn watch_document(&self, id: &str) -> Result<DocumentStream, StoreError> {
        let room = id.to_owned();
        self.watch(|watch| StoreRequest::WatchDocument { watch, room })
            .await
    }

    async fn watch_additions(
        &self,
        id: &str,
        collection: &str,
    ) -> Result<DocumentStream, StoreError> {
        let (room, collection) = (id.to_owned(), collection.to_owned());
        self.watch(|watch| StoreRequest::WatchAdditions {
            watch,
            room,
            collection,
        })
        .await
    }
}
