use crate::server::StoreService;
use crate::store::DocumentStream;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use rendezvous_core::{Document, StoreReply, StoreRequest};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<StoreService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: StoreService) {
    info!("New store connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<StoreReply>();

    let mut send_task = tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            let json = match serde_json::to_string(&reply) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize store reply: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        let mut watches = WatchTasks::new();

        loop {
            tokio::select! {
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<StoreRequest>(&text) {
                            Ok(request) => {
                                handle_request(&service, request, &tx, &mut watches).await;
                            }
                            Err(e) => warn!("Invalid store request: {:?}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
                Some(watch) = watches.finished() => {
                    debug!("Watch {} ended", watch);
                }
            }
        }

        watches.abort_all();
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    info!("Store connection closed");
}

/// Requests are handled in arrival order, so writes from one client apply in
/// the order it sent them.
async fn handle_request(
    service: &StoreService,
    request: StoreRequest,
    tx: &mpsc::UnboundedSender<StoreReply>,
    watches: &mut WatchTasks,
) {
    let store = service.store();
    let (watch, feed, wrap): (u64, _, fn(u64, Document) -> StoreReply) = match request {
        StoreRequest::WatchDocument { watch, room } => (
            watch,
            store.watch_document(&room).await,
            |watch, document| StoreReply::Snapshot { watch, document },
        ),
        StoreRequest::WatchAdditions {
            watch,
            room,
            collection,
        } => (
            watch,
            store.watch_additions(&room, &collection).await,
            |watch, document| StoreReply::Added { watch, document },
        ),
        StoreRequest::Unwatch { watch } => {
            if watches.cancel(watch) {
                debug!("Cancelled watch {}", watch);
            }
            return;
        }
        request => {
            if let Some(reply) = service.execute(request).await {
                let _ = tx.send(reply);
            }
            return;
        }
    };

    match feed {
        Ok(feed) => {
            watches.spawn(watch, feed, wrap, tx.clone());
        }
        Err(e) => {
            let _ = tx.send(StoreReply::WatchFailed {
                watch,
                reason: e.reason().to_owned(),
            });
        }
    }
}

/// Forwarding tasks of one connection, keyed by watch id.
///
/// A forwarder that exits on its own reports its id so the entry is dropped
/// without waiting for an `Unwatch` the client will never send.
struct WatchTasks {
    tasks: HashMap<u64, JoinHandle<()>>,
    done_tx: mpsc::UnboundedSender<u64>,
    done_rx: mpsc::UnboundedReceiver<u64>,
}

impl WatchTasks {
    fn new() -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            tasks: HashMap::new(),
            done_tx,
            done_rx,
        }
    }

    fn spawn(
        &mut self,
        watch: u64,
        mut feed: DocumentStream,
        wrap: fn(u64, Document) -> StoreReply,
        tx: mpsc::UnboundedSender<StoreReply>,
    ) {
        let done_tx = self.done_tx.clone();
        let task = tokio::spawn(async move {
            while let Some(item) = feed.next().await {
                let reply = match item {
                    Ok(document) => wrap(watch, document),
                    Err(e) => {
                        let _ = tx.send(StoreReply::WatchFailed {
                            watch,
                            reason: e.reason().to_owned(),
                        });
                        break;
                    }
                };
                if tx.send(reply).is_err() {
                    break;
                }
            }
            let _ = done_tx.send(watch);
        });
        self.tasks.insert(watch, task);
    }

    fn cancel(&mut self, watch: u64) -> bool {
        match self.tasks.remove(&watch) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Next forwarder that ended by itself. Cancel safe.
    async fn finished(&mut self) -> Option<u64> {
        let watch = self.done_rx.recv().await?;
        self.tasks.remove(&watch);
        Some(watch)
    }

    fn abort_all(self) {
        for (_, task) in self.tasks {
            task.abort();
        }
    }
}
