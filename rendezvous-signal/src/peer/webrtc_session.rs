use crate::error::{Result, SignallingError};
use crate::peer::{PeerConfig, PeerEvent, PeerSession};
use anyhow::Context;
use async_trait::async_trait;
use rendezvous_core::{Candidate, SdpKind, SessionDescriptor};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

#[derive(Default)]
struct RemoteCandidates {
    description_set: bool,
    buffered: Vec<RTCIceCandidateInit>,
}

/// [`PeerSession`] backed by a `webrtc` peer connection carrying one audio
/// and one video transceiver.
pub struct WebRtcPeerSession {
    peer_connection: Arc<RTCPeerConnection>,
    remote: Mutex<RemoteCandidates>,
}

impl WebRtcPeerSession {
    /// `event_tx` receives local candidates and transport state changes.
    pub async fn new(
        config: PeerConfig,
        event_tx: mpsc::Sender<PeerEvent>,
    ) -> anyhow::Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username.unwrap_or_default(),
                    credential: server.credential.unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
            peer_connection
                .add_transceiver_from_kind(kind, None)
                .await
                .context("Failed to add media transceiver")?;
        }

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state changed: {:?}", s);
                    let event = match s {
                        RTCPeerConnectionState::Connected => PeerEvent::TransportConnected,
                        RTCPeerConnectionState::Failed => PeerEvent::TransportFailed,
                        _ => return,
                    };
                    let _ = tx.send(event).await;
                })
            },
        ));

        let ice_tx = event_tx;
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let init = match candidate.to_json() {
                    Ok(init) => init,
                    Err(e) => {
                        warn!("Failed to serialize local ICE candidate: {}", e);
                        return;
                    }
                };
                if let Some(local) = local_candidate(init) {
                    let _ = tx.send(PeerEvent::LocalCandidate(local)).await;
                }
            })
        }));

        Ok(Self {
            peer_connection,
            remote: Mutex::new(RemoteCandidates::default()),
        })
    }

    async fn local_description(&self, kind: SdpKind) -> anyhow::Result<SessionDescriptor> {
        let description = match kind {
            SdpKind::Offer => self
                .peer_connection
                .create_offer(None)
                .await
                .context("Failed to create offer")?,
            SdpKind::Answer => self
                .peer_connection
                .create_answer(None)
                .await
                .context("Failed to create answer")?,
        };

        self.peer_connection
            .set_local_description(description.clone())
            .await
            .context("Failed to set local description")?;

        Ok(SessionDescriptor {
            kind,
            sdp: description.sdp,
        })
    }

    /// Applies the remote description, then the candidates that arrived early.
    async fn apply_remote(&self, descriptor: SessionDescriptor) -> anyhow::Result<()> {
        let description = match descriptor.kind {
            SdpKind::Offer => RTCSessionDescription::offer(descriptor.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(descriptor.sdp)?,
        };

        let mut remote = self.remote.lock().await;
        self.peer_connection
            .set_remote_description(description)
            .await
            .context("Failed to set remote description")?;
        remote.description_set = true;

        let buffered = std::mem::take(&mut remote.buffered);
        if !buffered.is_empty() {
            debug!("Applying {} buffered remote candidates", buffered.len());
        }
        for init in buffered {
            self.peer_connection
                .add_ice_candidate(init)
                .await
                .context("Failed to add buffered ICE candidate")?;
        }
        Ok(())
    }

    async fn add_candidate(&self, candidate: Candidate) -> anyhow::Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: Some(
                u16::try_from(candidate.sdp_m_line_index)
                    .context("sdpMLineIndex exceeds the engine's index range")?,
            ),
            username_fragment: None,
        };

        let mut remote = self.remote.lock().await;
        if !remote.description_set {
            remote.buffered.push(init);
            return Ok(());
        }

        self.peer_connection
            .add_ice_candidate(init)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }
}

/// Candidates without an m-line index cannot be matched by the remote side.
fn local_candidate(init: RTCIceCandidateInit) -> Option<Candidate> {
    let Some(index) = init.sdp_mline_index else {
        warn!("Dropping local ICE candidate without an m-line index: {}", init.candidate);
        return None;
    };
    debug!("Local ICE candidate: {}", init.candidate);
    Some(Candidate {
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: u32::from(index),
        candidate: init.candidate,
    })
}

fn negotiation(err: anyhow::Error) -> SignallingError {
    SignallingError::Negotiation(format!("{err:#}"))
}

#[async_trait]
impl PeerSession for WebRtcPeerSession {
    async fn create_local_offer(&self) -> Result<SessionDescriptor> {
        self.local_description(SdpKind::Offer)
            .await
            .map_err(negotiation)
    }

    async fn create_local_answer(&self) -> Result<SessionDescriptor> {
        self.local_description(SdpKind::Answer)
            .await
            .map_err(negotiation)
    }

    async fn set_remote_description(&self, descriptor: SessionDescriptor) -> Result<()> {
        self.apply_remote(descriptor).await.map_err(negotiation)
    }

    async fn add_remote_candidate(&self, candidate: Candidate) -> Result<()> {
        self.add_candidate(candidate).await.map_err(negotiation)
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .map_err(|e| SignallingError::Negotiation(e.to_string()))
    }
}
