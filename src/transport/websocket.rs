//! WebSocket transport
//!
//! Accepts TCP connections, authenticates them during the HTTP upgrade and
//! hands each resulting session to the `Relay`. Responsibilities:
//! - Enforce the connection limit and authentication before the upgrade
//!   completes (401 / 503 on rejection, no session is ever created)
//! - Run one read loop per connection, feeding text frames to
//!   `Relay::handle_inbound`
//! - Run one write loop per connection draining the session channel into the
//!   socket, so fan-out never waits on a slow peer
//! - Drop connections that do not finish the upgrade in time
//! - Deregister the session when either side closes, and send a Close frame
//!   when the relay drops the session

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::Message as WsMessage;

use crate::auth::{AuthRequest, AuthenticatedUser, Authenticator};
use crate::config::ServerSettings;
use crate::relay::Relay;
use crate::session::Session;
use crate::utils::RelayError;

/// Pause after a failed `accept` so fd exhaustion doesn't spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Upper bound on flushing the Close frame to a peer that stopped reading.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Per-connection limits applied by the accept loop.
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    pub max_connections: usize,
    pub handshake_timeout: Duration,
}

impl ServeOptions {
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            max_connections: settings.max_connections,
            handshake_timeout: Duration::from_millis(settings.handshake_timeout_ms),
        }
    }
}

/// Bind to the configured address and serve connections forever.
pub async fn start_websocket_server(
    settings: &ServerSettings,
    relay: Arc<Relay>,
    authenticator: Arc<dyn Authenticator>,
) -> Result<(), RelayError> {
    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(
        "WebSocket server listening on ws://{addr} (auth: {})",
        authenticator.name()
    );

    serve(listener, relay, authenticator, ServeOptions::from_settings(settings)).await;
    Ok(())
}

/// Accept loop over an already bound listener.
pub async fn serve(
    listener: TcpListener,
    relay: Arc<Relay>,
    authenticator: Arc<dyn Authenticator>,
    options: ServeOptions,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let relay = relay.clone();
                let authenticator = authenticator.clone();
                spawn(handle_connection(stream, peer, relay, authenticator, options));
            }
            Err(e) => {
                warn!("Failed to accept connection: {e}");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    relay: Arc<Relay>,
    authenticator: Arc<dyn Authenticator>,
    options: ServeOptions,
) {
    let max_connections = options.max_connections;
    let mut admitted: Option<AuthenticatedUser> = None;

    let callback = |request: &Request, response: Response| {
        if relay.session_count() >= max_connections {
            warn!("Rejecting {peer}: connection limit of {max_connections} reached");
            return Err(reject(StatusCode::SERVICE_UNAVAILABLE, "server is full"));
        }
        match authenticator.authenticate(&AuthRequest::from_http_request(request)) {
            Ok(user) => {
                admitted = Some(user);
                Ok(response)
            }
            Err(e) => {
                warn!("Rejecting {peer} ({}): {e}", authenticator.name());
                Err(reject(StatusCode::UNAUTHORIZED, &e.to_string()))
            }
        }
    };

    let handshake = accept_hdr_async(stream, callback);
    let ws_stream = match timeout(options.handshake_timeout, handshake).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            debug!("WebSocket handshake with {peer} failed: {e}");
            return;
        }
        Err(_) => {
            debug!(
                "WebSocket handshake with {peer} timed out after {:?}",
                options.handshake_timeout
            );
            return;
        }
    };
    let Some(user) = admitted else {
        return;
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<WsMessage>(relay.outbound_capacity());
    let session = Arc::new(Session::new(user.identity, tx).with_expiry(user.expires_at));
    let session_id = session.id().clone();

    // Forward queued frames from the relay to the peer until the session closes
    {
        let session = session.clone();
        spawn(async move {
            let pump = async {
                while let Some(frame) = rx.recv().await {
                    if let Err(e) = ws_sender.send(frame).await {
                        debug!("Failed to send message to {}: {e}", session.id());
                        break;
                    }
                }
            };
            tokio::select! {
                _ = pump => {}
                _ = session.closed() => {}
            }
            if let Ok(Err(e)) = timeout(CLOSE_GRACE, ws_sender.close()).await {
                debug!("Failed to close {}: {e}", session.id());
            }
            debug!("Send loop closed for {}", session.id());
        });
    }

    match relay.join(session.clone()) {
        Ok(replayed) => info!(
            "{session_id} connected from {peer} as {} ({replayed} replayed)",
            session.identity()
        ),
        Err(e) => {
            warn!("Could not open {session_id}: {e}");
            relay.leave(&session_id);
            session.close();
            return;
        }
    }

    loop {
        let frame = tokio::select! {
            frame = ws_receiver.next() => frame,
            // Dropped by the relay, e.g. after a failed delivery
            _ = session.closed() => break,
        };
        let Some(frame) = frame else {
            break;
        };
        match frame {
            Ok(WsMessage::Text(text)) => {
                let _ = relay.handle_inbound(&session, text.as_str());
            }
            Ok(WsMessage::Binary(data)) => {
                debug!("Ignoring {} byte binary frame from {session_id}", data.len());
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read error on {session_id}: {e}");
                break;
            }
        }
    }

    relay.leave(&session_id);
    session.close();
    info!("{session_id} ({}) disconnected", session.identity());
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}
