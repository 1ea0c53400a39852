use async_trait::async_trait;
use rendezvous_core::{Candidate, RoomId, SessionDescriptor};
use rendezvous_signal::{SignallingEvent, SignallingOutput};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};

/// Mock SignallingOutput that captures every notification.
///
/// # Example
///
/// ```ignore
/// let (output, mut rx) = MockSignallingOutput::new();
///
/// // ... controller applies the remote answer ...
///
/// if let Some(SignallingEvent::AnswerReceived(answer)) = rx.recv().await {
///     assert_eq!(answer.kind, SdpKind::Answer);
/// }
/// ```
#[derive(Clone)]
pub struct MockSignallingOutput {
    tx: mpsc::UnboundedSender<SignallingEvent>,
    events: Arc<Mutex<Vec<SignallingEvent>>>,
}

impl MockSignallingOutput {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SignallingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = Self {
            tx,
            events: Arc::new(Mutex::new(Vec::new())),
        };
        (output, rx)
    }

    pub async fn get_events(&self) -> Vec<SignallingEvent> {
        self.events.lock().await.clone()
    }

    pub async fn answers(&self) -> Vec<SessionDescriptor> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                SignallingEvent::AnswerReceived(answer) => Some(answer.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn ice_candidates(&self) -> Vec<Candidate> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                SignallingEvent::IceCandidateReceived(candidate) => Some(candidate.clone()),
                _ => None,
            })
            .collect()
    }

    /// Wait until at least `count` candidates arrived, then return them all.
    pub async fn wait_for_candidates(&self, count: usize, timeout_ms: u64) -> Vec<Candidate> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            let candidates = self.ice_candidates().await;
            if candidates.len() >= count || start.elapsed() > timeout {
                return candidates;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn capture(&self, event: SignallingEvent) {
        tracing::debug!("[MockOutput] {:?}", event);
        self.events.lock().await.push(event.clone());
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl SignallingOutput for MockSignallingOutput {
    async fn on_room_created(&self, room: RoomId) {
        self.capture(SignallingEvent::RoomCreated(room)).await;
    }

    async fn on_offer_received(&self, offer: SessionDescriptor) {
        self.capture(SignallingEvent::OfferReceived(offer)).await;
    }

    async fn on_answer_received(&self, answer: SessionDescriptor) {
        self.capture(SignallingEvent::AnswerReceived(answer)).await;
    }

    async fn on_ice_candidate_received(&self, candidate: Candidate) {
        self.capture(SignallingEvent::IceCandidateReceived(candidate))
            .await;
    }
}
