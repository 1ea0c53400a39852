use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::*;
use rendezvous::RoomId;
use rendezvous::model::IceServerConfig;
use rendezvous::signal::{
    ChannelOutput, ControllerConfig, MemoryDocumentStore, NegotiationState, PeerConfig,
    PeerSession, RemoteDocumentStore, SessionHandle, SignallingController, SignallingEvent,
    StoreService, WebRtcPeerSession, store_router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rdv", version, about = "Two-party call setup through a shared room store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the WebSocket room store.
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
    },

    /// Create a room, publish an offer and wait for someone to answer.
    Call(SessionArgs),

    /// Join a room and answer its offer.
    Answer {
        room: String,

        #[command(flatten)]
        session: SessionArgs,
    },
}

#[derive(clap::Args)]
struct SessionArgs {
    #[arg(long, env = "RENDEZVOUS_STORE_URL", default_value = "ws://127.0.0.1:3000/store")]
    store: String,

    /// STUN server URLs. Google's public servers when empty.
    #[arg(long = "ice-server", env = "RENDEZVOUS_ICE_SERVERS", value_delimiter = ',')]
    ice_servers: Vec<String>,

    /// Seconds to wait for the transport to come up.
    #[arg(long, default_value_t = 120)]
    timeout: u64,
}

struct Session {
    handle: SessionHandle,
    peer: Arc<WebRtcPeerSession>,
    events: mpsc::UnboundedReceiver<SignallingEvent>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { addr } => serve(addr).await,
        Commands::Call(args) => call(args).await,
        Commands::Answer { room, session } => answer(RoomId::from(room), session).await,
    }
}

async fn serve(addr: SocketAddr) -> Result<()> {
    let app = store_router(StoreService::new(Arc::new(MemoryDocumentStore::new())));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!("{}", "📡 Room store is up".green().bold());
    println!("   ws://{}/store", addr);
    info!("Room store listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Room store stopped")?;

    println!("{}", "Room store stopped.".yellow());
    Ok(())
}

async fn call(args: SessionArgs) -> Result<()> {
    let session = open_session(&args).await?;

    let room = session.handle.create_room().await?;
    println!("{} {}", "🚪 Room created:".green().bold(), room.as_str().yellow());
    println!("   Join with: rdv answer {}", room);

    let offer = session
        .peer
        .create_local_offer()
        .await
        .context("Failed to create offer")?;
    session.handle.publish_local_offer(offer).await?;
    session.handle.begin_remote_candidate_exchange().await?;
    println!("{}", "⏳ Waiting for an answer...".cyan());

    stay_connected(session, args.timeout).await
}

async fn answer(room: RoomId, args: SessionArgs) -> Result<()> {
    let session = open_session(&args).await?;

    println!("{} {}", "🚪 Joining room".green().bold(), room.as_str().yellow());
    session
        .handle
        .join_room(room.clone())
        .await
        .with_context(|| format!("Failed to join room {room}"))?;
    session.handle.begin_remote_candidate_exchange().await?;
    println!("{}", "📨 Answer sent".cyan());

    stay_connected(session, args.timeout).await
}

async fn open_session(args: &SessionArgs) -> Result<Session> {
    let store = RemoteDocumentStore::connect(&args.store)
        .await
        .with_context(|| format!("Failed to reach room store at {}", args.store))?;

    let config = if args.ice_servers.is_empty() {
        PeerConfig::default()
    } else {
        PeerConfig {
            ice_servers: vec![IceServerConfig::stun(args.ice_servers.iter().cloned())],
        }
    };

    let (peer_tx, peer_rx) = mpsc::channel(64);
    let peer = Arc::new(
        WebRtcPeerSession::new(config, peer_tx)
            .await
            .context("Failed to create peer connection")?,
    );
    let (output, events) = ChannelOutput::new();

    let handle = SignallingController::spawn(
        Arc::new(store),
        peer.clone(),
        peer_rx,
        Arc::new(output),
        ControllerConfig::default(),
    );

    Ok(Session {
        handle,
        peer,
        events,
    })
}

/// Report signalling progress until the transport is up, then hold the call
/// until Ctrl-C.
async fn stay_connected(mut session: Session, timeout_secs: u64) -> Result<()> {
    let handle = session.handle.clone();
    let settled = handle.wait_for(|status| {
        status.state == NegotiationState::Connected || status.state.is_terminal()
    });
    tokio::pin!(settled);
    let deadline = tokio::time::sleep(Duration::from_secs(timeout_secs));
    tokio::pin!(deadline);

    let outcome = loop {
        tokio::select! {
            Some(event) = session.events.recv() => report(&event),
            status = &mut settled => break status.map_err(anyhow::Error::from),
            _ = &mut deadline => {
                break Err(anyhow!("No connection after {timeout_secs}s"));
            }
            _ = tokio::signal::ctrl_c() => break Err(anyhow!("Interrupted")),
        }
    };

    let result = match outcome {
        Ok(status) if status.state == NegotiationState::Connected => {
            println!("{}", "✨ Connected. Press Ctrl-C to hang up.".green().bold());
            let _ = tokio::signal::ctrl_c().await;
            Ok(())
        }
        Ok(status) => Err(match status.error {
            Some(e) => anyhow::Error::from(e).context("Signalling failed"),
            None => anyhow!("Session ended in state {:?}", status.state),
        }),
        Err(e) => Err(e),
    };

    session.handle.close().await.ok();
    println!("{}", "👋 Call closed.".yellow());
    result
}

fn report(event: &SignallingEvent) {
    match event {
        SignallingEvent::RoomCreated(_) => {}
        SignallingEvent::OfferReceived(_) => println!("{}", "📨 Offer received".cyan()),
        SignallingEvent::AnswerReceived(_) => println!("{}", "📨 Answer received".cyan()),
        SignallingEvent::IceCandidateReceived(candidate) => {
            println!("   {} {}", "candidate".dimmed(), candidate.candidate.dimmed());
        }
    }
}
