use futures::StreamExt;
use futures::stream::BoxStream;
use rendezvous_core::{
    Candidate, DecodeError, Role, RoomField, RoomId, RoomSnapshot, SessionDescriptor,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::controller::{
    ControllerCommand, ControllerConfig, NegotiationState, SessionHandle, SessionStatus,
};
use crate::error::{Result, SignallingError};
use crate::peer::{PeerEvent, PeerSession};
use crate::signaling::SignallingOutput;
use crate::store::{DocumentStore, RoomClient};

/// Deliveries from the room subscriptions, funnelled into the controller loop.
enum StoreEvent {
    Snapshot(Result<RoomSnapshot>),
    RemoteCandidate(Result<Candidate>),
}

/// Actor owning the negotiation state of one signalling session.
///
/// Commands from [`SessionHandle`]s, peer session events and room
/// subscription deliveries are all handled on the single task running
/// [`SignallingController::run`], so state, role and room id are never
/// shared.
pub struct SignallingController {
    rooms: RoomClient,
    peer: Arc<dyn PeerSession>,
    output: Arc<dyn SignallingOutput>,

    command_rx: mpsc::Receiver<ControllerCommand>,
    peer_rx: mpsc::Receiver<PeerEvent>,

    /// Cloned into every subscription forwarding task.
    store_tx: mpsc::Sender<StoreEvent>,
    store_rx: mpsc::Receiver<StoreEvent>,

    status_tx: watch::Sender<SessionStatus>,

    state: NegotiationState,
    /// Set once, by `create_room` or `join_room`.
    role: Option<Role>,
    room: Option<RoomId>,

    /// Local candidates discovered before the room and role were known.
    pending_candidates: Vec<Candidate>,
    answer_delivered: bool,
    exchanging: bool,
    subscriptions: Vec<JoinHandle<()>>,
}

impl SignallingController {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        peer: Arc<dyn PeerSession>,
        peer_rx: mpsc::Receiver<PeerEvent>,
        output: Arc<dyn SignallingOutput>,
        config: ControllerConfig,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (store_tx, store_rx) = mpsc::channel(config.event_capacity);
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());

        let controller = Self {
            rooms: RoomClient::new(store),
            peer,
            output,
            command_rx,
            peer_rx,
            store_tx,
            store_rx,
            status_tx,
            state: NegotiationState::Idle,
            role: None,
            room: None,
            pending_candidates: Vec::new(),
            answer_delivered: false,
            exchanging: false,
            subscriptions: Vec::new(),
        };

        (controller, SessionHandle::new(command_tx, status_rx))
    }

    /// Build a controller and run it on its own task.
    pub fn spawn(
        store: Arc<dyn DocumentStore>,
        peer: Arc<dyn PeerSession>,
        peer_rx: mpsc::Receiver<PeerEvent>,
        output: Arc<dyn SignallingOutput>,
        config: ControllerConfig,
    ) -> SessionHandle {
        let (controller, handle) = Self::new(store, peer, peer_rx, output, config);
        tokio::spawn(controller.run());
        handle
    }

    pub async fn run(mut self) {
        info!("Signalling controller started");
        let mut peer_open = true;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(ControllerCommand::Close { reply }) => {
                            self.shutdown().await;
                            let _ = reply.send(Ok(()));
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All session handles dropped. Closing session.");
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                evt = self.peer_rx.recv(), if peer_open => {
                    match evt {
                        Some(e) => self.handle_peer_event(e).await,
                        None => {
                            debug!("Peer event channel closed");
                            peer_open = false;
                        }
                    }
                }

                // Never closes: `store_tx` lives in `self`.
                Some(evt) = self.store_rx.recv() => {
                    self.handle_store_event(evt).await;
                }
            }
        }

        info!("Signalling controller finished");
    }

    async fn handle_command(&mut self, cmd: ControllerCommand) {
        match cmd {
            ControllerCommand::CreateRoom { reply } => {
                let _ = reply.send(self.create_room().await);
            }
            ControllerCommand::JoinRoom { room, reply } => {
                let _ = reply.send(self.join_room(room).await);
            }
            ControllerCommand::PublishLocalOffer { offer, reply } => {
                let _ = reply.send(self.publish_local_offer(offer).await);
            }
            ControllerCommand::PublishLocalAnswer { answer, reply } => {
                let _ = reply.send(self.publish_local_answer(answer).await);
            }
            ControllerCommand::BeginRemoteCandidateExchange { reply } => {
                let _ = reply.send(self.begin_remote_candidate_exchange().await);
            }
            // Handled by the loop itself.
            ControllerCommand::Close { reply } => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        if self.state.is_terminal() {
            debug!("Ignoring peer event in state {:?}", self.state);
            return;
        }

        match event {
            PeerEvent::LocalCandidate(candidate) => {
                if let Err(e) = self.on_local_candidate(candidate).await {
                    self.fail(e);
                }
            }
            PeerEvent::TransportConnected => self.transition(NegotiationState::Connected),
            PeerEvent::TransportFailed => {
                self.fail(SignallingError::Negotiation("transport failed".to_owned()));
            }
        }
    }

    async fn handle_store_event(&mut self, event: StoreEvent) {
        if self.state.is_terminal() {
            return;
        }

        let result = match event {
            StoreEvent::Snapshot(snapshot) => match snapshot {
                Ok(snapshot) => self.on_remote_answer_available(snapshot).await,
                Err(e) => Err(e),
            },
            StoreEvent::RemoteCandidate(candidate) => match candidate {
                Ok(candidate) => self.on_remote_candidate(candidate).await,
                Err(e) => Err(e),
            },
        };

        if let Err(e) = result {
            self.fail(e);
        }
    }

    async fn create_room(&mut self) -> Result<RoomId> {
        self.expect_state("create_room", NegotiationState::Idle)?;

        let room = self.rooms.create().await.inspect_err(|e| self.fail(e.clone()))?;
        info!("Created room {}", room);

        self.role = Some(Role::Caller);
        self.room = Some(room.clone());
        self.transition(NegotiationState::RoomPending);
        self.output.on_room_created(room.clone()).await;

        self.flush_pending_candidates()
            .await
            .inspect_err(|e| self.fail(e.clone()))?;
        Ok(room)
    }

    async fn join_room(&mut self, room: RoomId) -> Result<()> {
        self.expect_state("join_room", NegotiationState::Idle)?;
        info!("Joining room {}", room);

        // A missing offer leaves the session idle so the join can be retried.
        let snapshot = self
            .rooms
            .get(&room)
            .await
            .inspect_err(|e| self.fail(e.clone()))?;
        let Some(offer) = snapshot.and_then(|snapshot| snapshot.offer) else {
            debug!("Room {} has no offer yet", room);
            return Err(SignallingError::OfferNotFound(room));
        };

        self.role = Some(Role::Callee);
        self.room = Some(room);

        let result = self.answer_offer(offer).await;
        if let Err(e) = &result
            && !self.state.is_terminal()
        {
            self.fail(e.clone());
        }
        result
    }

    async fn answer_offer(&mut self, offer: SessionDescriptor) -> Result<()> {
        self.transition(NegotiationState::HasRemoteOffer);
        self.peer.set_remote_description(offer.clone()).await?;
        self.output.on_offer_received(offer).await;
        self.flush_pending_candidates().await?;

        let answer = self.peer.create_local_answer().await?;
        self.publish_local_answer(answer).await
    }

    async fn publish_local_offer(&mut self, offer: SessionDescriptor) -> Result<()> {
        const OPERATION: &str = "publish_local_offer";
        self.expect_role(OPERATION, Role::Caller)?;
        self.expect_state(OPERATION, NegotiationState::RoomPending)?;
        let room = self.checked_room(RoomField::Offer, &offer)?;

        let result = self.write_offer(room, offer).await;
        if let Err(e) = &result {
            self.fail(e.clone());
        }
        result
    }

    async fn write_offer(&mut self, room: RoomId, offer: SessionDescriptor) -> Result<()> {
        self.rooms.set_field(&room, RoomField::Offer, &offer).await?;
        self.transition(NegotiationState::OfferSent);

        // Only after the offer is stored, so the answer we see is for it.
        let snapshots = self.rooms.subscribe_document(&room).await?;
        self.forward(snapshots, StoreEvent::Snapshot);
        debug!("Watching room {} for an answer", room);
        Ok(())
    }

    async fn publish_local_answer(&mut self, answer: SessionDescriptor) -> Result<()> {
        const OPERATION: &str = "publish_local_answer";
        self.expect_role(OPERATION, Role::Callee)?;
        self.expect_state(OPERATION, NegotiationState::HasRemoteOffer)?;
        let room = self.checked_room(RoomField::Answer, &answer)?;

        self.rooms
            .set_field(&room, RoomField::Answer, &answer)
            .await
            .inspect_err(|e| self.fail(e.clone()))?;
        self.transition(NegotiationState::Negotiated);
        Ok(())
    }

    async fn begin_remote_candidate_exchange(&mut self) -> Result<()> {
        const OPERATION: &str = "begin_remote_candidate_exchange";
        if self.state.is_terminal() || self.exchanging {
            return Err(self.invalid_state(OPERATION));
        }
        let (Some(role), Some(room)) = (self.role, self.room.clone()) else {
            return Err(SignallingError::InvalidRole {
                operation: OPERATION,
                role: None,
            });
        };

        let candidates = self
            .rooms
            .subscribe_subcollection_additions(&room, role.remote_candidates())
            .await
            .inspect_err(|e| self.fail(e.clone()))?;
        self.exchanging = true;
        self.forward(candidates, StoreEvent::RemoteCandidate);
        info!(
            "Relaying {} from room {}",
            role.remote_candidates().as_str(),
            room
        );
        Ok(())
    }

    async fn on_remote_answer_available(&mut self, snapshot: RoomSnapshot) -> Result<()> {
        let Some(answer) = snapshot.answer else {
            return Ok(());
        };
        if self.answer_delivered {
            debug!("Answer already applied, ignoring snapshot");
            return Ok(());
        }
        if answer.sdp.is_empty() {
            debug!("Answer field is empty, still waiting");
            return Ok(());
        }
        info!("Received answer");

        self.peer.set_remote_description(answer.clone()).await?;
        self.answer_delivered = true;
        self.output.on_answer_received(answer).await;
        if self.state == NegotiationState::OfferSent {
            self.transition(NegotiationState::Negotiated);
        }
        Ok(())
    }

    async fn on_local_candidate(&mut self, candidate: Candidate) -> Result<()> {
        let (Some(role), Some(room)) = (self.role, self.room.as_ref()) else {
            debug!("Queueing local candidate until a room is assigned");
            self.pending_candidates.push(candidate);
            return Ok(());
        };

        self.rooms
            .add_to_subcollection(room, role.own_candidates(), &candidate)
            .await
    }

    async fn on_remote_candidate(&mut self, candidate: Candidate) -> Result<()> {
        debug!("Remote candidate: {}", candidate.candidate);
        self.peer.add_remote_candidate(candidate.clone()).await?;
        self.output.on_ice_candidate_received(candidate).await;
        Ok(())
    }

    async fn flush_pending_candidates(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_candidates);
        if !pending.is_empty() {
            debug!("Flushing {} queued local candidates", pending.len());
        }
        for candidate in pending {
            self.on_local_candidate(candidate).await?;
        }
        Ok(())
    }

    /// Spawn a task feeding `stream` into the loop. It stops after the first error.
    fn forward<T: Send + 'static>(
        &mut self,
        mut stream: BoxStream<'static, Result<T>>,
        wrap: fn(Result<T>) -> StoreEvent,
    ) {
        let tx = self.store_tx.clone();
        self.subscriptions.push(tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                let terminal = item.is_err();
                if tx.send(wrap(item)).await.is_err() || terminal {
                    break;
                }
            }
        }));
    }

    fn cancel_subscriptions(&mut self) {
        for task in self.subscriptions.drain(..) {
            task.abort();
        }
    }

    async fn shutdown(&mut self) {
        self.cancel_subscriptions();
        if let Err(e) = self.peer.close().await {
            warn!("Failed to close peer session: {}", e);
        }
        self.transition(NegotiationState::Closed);
    }

    fn fail(&mut self, err: SignallingError) {
        if self.state.is_terminal() {
            return;
        }
        error!("Signalling failed in state {:?}: {}", self.state, err);

        self.cancel_subscriptions();
        self.state = NegotiationState::Failed;
        self.status_tx.send_replace(SessionStatus {
            state: NegotiationState::Failed,
            error: Some(err),
        });
    }

    fn transition(&mut self, state: NegotiationState) {
        info!("Negotiation state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.status_tx.send_replace(SessionStatus { state, error: None });
    }

    fn invalid_state(&self, operation: &'static str) -> SignallingError {
        SignallingError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn expect_state(&self, operation: &'static str, expected: NegotiationState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    fn expect_role(&self, operation: &'static str, expected: Role) -> Result<()> {
        if self.role == Some(expected) {
            Ok(())
        } else {
            Err(SignallingError::InvalidRole {
                operation,
                role: self.role,
            })
        }
    }

    /// Room to write `descriptor` into, provided its kind matches `field`.
    fn checked_room(&self, field: RoomField, descriptor: &SessionDescriptor) -> Result<RoomId> {
        if descriptor.kind.field() != field {
            return Err(DecodeError::KindMismatch {
                field: field.as_str().to_owned(),
                found: descriptor.kind,
            }
            .into());
        }
        self.room.clone().ok_or_else(|| self.invalid_state(field.as_str()))
    }
}
