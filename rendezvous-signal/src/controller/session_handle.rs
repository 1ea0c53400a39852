use crate::controller::{ControllerCommand, SessionStatus};
use crate::error::{Result, SignallingError};
use rendezvous_core::{RoomId, SessionDescriptor};
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable front end of a running [`SignallingController`].
///
/// Every call is a round trip through the controller task. Once the task
/// has stopped, calls fail with [`SignallingError::SessionClosed`]. Dropping
/// the last handle closes the session.
///
/// [`SignallingController`]: crate::controller::SignallingController
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<ControllerCommand>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<ControllerCommand>,
        status_rx: watch::Receiver<SessionStatus>,
    ) -> Self {
        Self {
            command_tx,
            status_rx,
        }
    }

    pub async fn create_room(&self) -> Result<RoomId> {
        self.request(|reply| ControllerCommand::CreateRoom { reply })
            .await
    }

    pub async fn join_room(&self, room: RoomId) -> Result<()> {
        self.request(|reply| ControllerCommand::JoinRoom { room, reply })
            .await
    }

    pub async fn publish_local_offer(&self, offer: SessionDescriptor) -> Result<()> {
        self.request(|reply| ControllerCommand::PublishLocalOffer { offer, reply })
            .await
    }

    pub async fn publish_local_answer(&self, answer: SessionDescriptor) -> Result<()> {
        self.request(|reply| ControllerCommand::PublishLocalAnswer { answer, reply })
            .await
    }

    pub async fn begin_remote_candidate_exchange(&self) -> Result<()> {
        self.request(|reply| ControllerCommand::BeginRemoteCandidateExchange { reply })
            .await
    }

    pub async fn close(&self) -> Result<()> {
        self.request(|reply| ControllerCommand::Close { reply })
            .await
    }

    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    /// Wait until the published status satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl Fn(&SessionStatus) -> bool,
    ) -> Result<SessionStatus> {
        let mut status_rx = self.status_rx.clone();
        let status = status_rx
            .wait_for(|status| predicate(status))
            .await
            .map_err(|_| SignallingError::SessionClosed)?;
        Ok(status.clone())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> ControllerCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| SignallingError::SessionClosed)?;
        reply_rx.await.map_err(|_| SignallingError::SessionClosed)?
    }
}
