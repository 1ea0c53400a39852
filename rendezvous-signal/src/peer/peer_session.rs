use crate::error::Result;
use async_trait::async_trait;
use rendezvous_core::{Candidate, SessionDescriptor};

/// The transport engine as seen by the signalling controller.
///
/// Implementations report local candidates and transport lifecycle through
/// the `PeerEvent` channel they were built with.
#[async_trait]
pub trait PeerSession: Send + Sync + 'static {
    /// Produce an offer and apply it as the local description.
    async fn create_local_offer(&self) -> Result<SessionDescriptor>;

    /// Produce an answer and apply it as the local description.
    /// A remote offer must already be set.
    async fn create_local_answer(&self) -> Result<SessionDescriptor>;

    async fn set_remote_description(&self, descriptor: SessionDescriptor) -> Result<()>;

    /// Safe to call before the remote description is set.
    async fn add_remote_candidate(&self, candidate: Candidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
