//! WebSocket server: accept loop and per-connection tasks.
//!
//! Each accepted connection gets:
//!
//! - a **reader** (the session task itself) that feeds every text and binary
//!   frame to the [`RelayHub`], and
//! - a **writer** task that drains the connection's outbound queue into the
//!   socket.
//!
//! The session ends when either side finishes.  The hub is told exactly once
//! via [`RelayHub::disconnect`].
//!
//! # Shutdown
//!
//! When the `running` flag is cleared the accept loop stops, every endpoint
//! receives `server-shutdown`, and the registry drops its queue handles so
//! each writer flushes, sends a Close frame and exits.  Sessions still open
//! after [`SESSION_DRAIN_TIMEOUT`] are abandoned.  The listening socket is
//! closed only after that.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use screenlink_core::protocol::encode_server_message;
use screenlink_core::{EndpointId, ServerMessage};

use crate::application::actuator::InputActuator;
use crate::application::lifecycle::{RelayError, RelayHub};
use crate::application::outbound::Outbound;
use crate::domain::RelayConfig;

/// How often the accept loop rechecks the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// How long shutdown waits for sessions to close.
pub const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a finished reader waits for its writer to flush.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    config: RelayConfig,
    actuator: Arc<dyn InputActuator>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    info!("screenlink relay listening on {}", config.bind_addr);

    let hub = RelayHub::new(config, actuator);
    serve(listener, hub, running).await
}

/// Runs the accept loop on an already bound listener.
///
/// Split from [`run_server`] so tests can bind port 0 and learn the address
/// before serving.
///
/// # Errors
///
/// Currently infallible after binding; the `Result` leaves room for fatal
/// listener errors.
pub async fn serve(
    listener: TcpListener,
    hub: Arc<RelayHub>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let mut sessions = JoinSet::new();

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Reap finished sessions so the set does not grow without bound.
        while let Some(done) = sessions.try_join_next() {
            if let Err(e) = done {
                if e.is_panic() {
                    error!("session task panicked: {e}");
                }
            }
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let hub = Arc::clone(&hub);
                sessions.spawn(async move {
                    handle_connection(stream, peer_addr, hub).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout; loop back to check `running`.
            }
        }
    }

    hub.shutdown_all().await;

    let drained = timeout(SESSION_DRAIN_TIMEOUT, async {
        while sessions.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(
            remaining = sessions.len(),
            "sessions still open after {:?}; aborting",
            SESSION_DRAIN_TIMEOUT
        );
        sessions.abort_all();
    }

    // The listener outlives every transport.
    drop(listener);
    info!("relay stopped");
    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, hub: Arc<RelayHub>) {
    match run_session(stream, peer_addr, hub).await {
        Ok(()) => debug!("session {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    hub: Arc<RelayHub>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let (ws_tx, mut ws_rx) = ws_stream.split();
    let (id, outbound_rx) = hub.connect(Outbound::channel).await;
    info!(endpoint = %id, %peer_addr, "WebSocket session established");

    let mut writer = tokio::spawn(write_outbound(id, ws_tx, outbound_rx));
    let mut writer_done = false;

    // ── Reader ────────────────────────────────────────────────────────────────
    let reader = async {
        loop {
            let ws_msg = match ws_rx.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                    debug!(endpoint = %id, "WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!(endpoint = %id, "WebSocket error: {e}");
                    break;
                }
                None => {
                    debug!(endpoint = %id, "stream ended");
                    break;
                }
            };

            match ws_msg {
                WsMessage::Text(text) => {
                    if let Err(e) = hub.handle_text(id, &text).await {
                        log_rejected(id, &e);
                    }
                }
                WsMessage::Binary(data) => {
                    if let Err(e) = hub.handle_binary(id, &data).await {
                        log_rejected(id, &e);
                    }
                }
                WsMessage::Ping(data) => {
                    // tungstenite queues the Pong; the writer flushes it
                    debug!(endpoint = %id, "WebSocket ping ({} bytes)", data.len());
                }
                WsMessage::Pong(_) => {}
                WsMessage::Close(_) => {
                    debug!(endpoint = %id, "Close frame received");
                    break;
                }
                WsMessage::Frame(_) => {}
            }
        }
    };

    tokio::select! {
        () = reader => {}
        _ = &mut writer => {
            writer_done = true;
            debug!(endpoint = %id, "writer finished first");
        }
    }

    hub.disconnect(id).await;

    // Disconnect dropped the last queue handle, so the writer is winding down.
    if !writer_done && timeout(WRITER_FLUSH_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    Ok(())
}

/// Drains `rx` into the socket until the queue closes, then sends Close.
async fn write_outbound<S>(id: EndpointId, mut sink: S, mut rx: mpsc::Receiver<ServerMessage>)
where
    S: futures_util::Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Some(msg) = rx.recv().await {
        let text = match encode_server_message(&msg) {
            Ok(text) => text,
            Err(e) => {
                error!(endpoint = %id, "{e}");
                continue;
            }
        };
        if let Err(e) = sink.send(WsMessage::Text(text)).await {
            debug!(endpoint = %id, "send failed (peer gone): {e}");
            return;
        }
    }

    let _ = sink.send(WsMessage::Close(None)).await;
    let _ = sink.close().await;
}

fn log_rejected(id: EndpointId, err: &RelayError) {
    match err {
        RelayError::Protocol(e) => warn!(endpoint = %id, "rejected frame: {e}"),
        RelayError::Registry(e) => warn!(endpoint = %id, "{e}"),
        RelayError::Route(e) => debug!(endpoint = %id, "{e}"),
        RelayError::NotAViewer(_) => debug!(endpoint = %id, "{err}"),
    }
}
