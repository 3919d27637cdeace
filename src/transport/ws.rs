//! WebSocket transport over tokio-tungstenite.
//!
//! Server side accepts charge-point connections at
//! `ws://<host>:<port><path>` where the configured path pattern names the
//! peer-id segment (e.g. `/ocpp/{id}`). The OCPP-J subprotocol is
//! negotiated during the handshake; frames are JSON text messages. Each
//! connection gets a writer task fed by an unbounded channel, so `send`
//! never blocks the caller.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::{
    ClientMessageHandler, ClientValidator, DisconnectHandler, PeerHandler, ServerMessageHandler,
    TransportClient, TransportError, TransportServer,
};
use crate::support::shutdown::ShutdownSignal;

/// OCPP 1.6 WebSocket subprotocol token.
const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

// ── Path pattern ───────────────────────────────────────────────

/// A listen path with an `{id}` placeholder, e.g. `/ocpp/{id}`.
#[derive(Debug, Clone)]
struct PathPattern {
    prefix: String,
    suffix: String,
}

impl PathPattern {
    fn parse(pattern: &str) -> Result<Self, TransportError> {
        let Some(placeholder) = pattern.find("{id}") else {
            return Err(TransportError::InvalidPathPattern(pattern.to_string()));
        };
        Ok(Self {
            prefix: pattern[..placeholder].to_string(),
            suffix: pattern[placeholder + "{id}".len()..].to_string(),
        })
    }

    /// Extract the peer id from a request path.
    fn extract(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        let id = rest.strip_suffix(self.suffix.as_str())?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(id.to_string())
    }
}

// ── Server ─────────────────────────────────────────────────────

#[derive(Default)]
struct ServerHandlers {
    on_connect: RwLock<Option<PeerHandler>>,
    on_disconnect: RwLock<Option<PeerHandler>>,
    on_message: RwLock<Option<ServerMessageHandler>>,
    validate_client: RwLock<Option<ClientValidator>>,
}

impl ServerHandlers {
    fn connect(&self, peer_id: &str) {
        if let Some(handler) = self.on_connect.read().unwrap().clone() {
            handler(peer_id);
        }
    }

    fn disconnect(&self, peer_id: &str) {
        if let Some(handler) = self.on_disconnect.read().unwrap().clone() {
            handler(peer_id);
        }
    }

    fn message(&self, peer_id: &str, text: &str) {
        if let Some(handler) = self.on_message.read().unwrap().clone() {
            handler(peer_id, text);
        }
    }

    fn validate(&self, peer_id: &str) -> bool {
        match self.validate_client.read().unwrap().clone() {
            Some(validator) => validator(peer_id),
            None => true,
        }
    }
}

/// WebSocket server transport for a central system.
pub struct WsTransportServer {
    bind_host: String,
    sessions: Arc<DashMap<String, mpsc::UnboundedSender<String>>>,
    handlers: Arc<ServerHandlers>,
    shutdown: ShutdownSignal,
}

impl WsTransportServer {
    pub fn new() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            sessions: Arc::new(DashMap::new()),
            handlers: Arc::new(ServerHandlers::default()),
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    /// Ids of the currently connected peers.
    pub fn connected_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for WsTransportServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportServer for WsTransportServer {
    async fn start(&self, port: u16, path_pattern: &str) -> Result<(), TransportError> {
        let pattern = PathPattern::parse(path_pattern)?;
        let addr = format!("{}:{}", self.bind_host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::Bind(format!("{addr}: {e}")))?;

        info!("OCPP 1.6 WebSocket server listening on ws://{}{}", addr, path_pattern);

        let sessions = self.sessions.clone();
        let handlers = self.handlers.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer_addr)) => {
                                let sessions = sessions.clone();
                                let handlers = handlers.clone();
                                let shutdown = shutdown.clone();
                                let pattern = pattern.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(
                                        stream, peer_addr, pattern, sessions, handlers, shutdown,
                                    )
                                    .await
                                    {
                                        error!("connection error from {}: {}", peer_addr, e);
                                    }
                                });
                            }
                            Err(e) => error!("failed to accept connection: {}", e),
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("WebSocket server shutting down");
                        return;
                    }
                }
            }
        });
        Ok(())
    }

    async fn stop(&self) {
        self.shutdown.trigger();
    }

    fn send(&self, peer_id: &str, message: String) -> Result<(), TransportError> {
        let session = self
            .sessions
            .get(peer_id)
            .ok_or_else(|| TransportError::NotConnected(peer_id.to_string()))?;
        session
            .send(message)
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn set_on_connect(&self, handler: PeerHandler) {
        *self.handlers.on_connect.write().unwrap() = Some(handler);
    }

    fn set_on_disconnect(&self, handler: PeerHandler) {
        *self.handlers.on_disconnect.write().unwrap() = Some(handler);
    }

    fn set_on_message(&self, handler: ServerMessageHandler) {
        *self.handlers.on_message.write().unwrap() = Some(handler);
    }

    fn set_validate_client(&self, validator: ClientValidator) {
        *self.handlers.validate_client.write().unwrap() = Some(validator);
    }
}

/// Handle a single charge-point connection end to end.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    pattern: PathPattern,
    sessions: Arc<DashMap<String, mpsc::UnboundedSender<String>>>,
    handlers: Arc<ServerHandlers>,
    shutdown: ShutdownSignal,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut peer_id: Option<String> = None;

    let handshake_handlers = handlers.clone();
    let handshake_pattern = pattern;
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, mut response: Response| {
        let path = req.uri().path();
        debug!("WebSocket handshake from {}, path: {}", peer_addr, path);

        let requested_protocols = req
            .headers()
            .get("Sec-WebSocket-Protocol")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let supports_ocpp16 = requested_protocols
            .split(',')
            .map(|s| s.trim())
            .any(|p| p == OCPP_SUBPROTOCOL);
        if supports_ocpp16 {
            response
                .headers_mut()
                .insert("Sec-WebSocket-Protocol", OCPP_SUBPROTOCOL.parse().unwrap());
        } else if !requested_protocols.is_empty() {
            warn!(
                "client {} does not offer {}, requested: {}",
                peer_addr, OCPP_SUBPROTOCOL, requested_protocols
            );
        }

        let Some(id) = handshake_pattern.extract(path) else {
            let mut reject = ErrorResponse::new(Some("unknown path".to_string()));
            *reject.status_mut() = StatusCode::NOT_FOUND;
            return Err(reject);
        };
        if !handshake_handlers.validate(&id) {
            info!("[{}] connection rejected by client validator", id);
            let mut reject = ErrorResponse::new(Some("client rejected".to_string()));
            *reject.status_mut() = StatusCode::UNAUTHORIZED;
            return Err(reject);
        }

        peer_id = Some(id);
        Ok(response)
    })
    .await?;

    // The handshake closure only succeeds after setting the id.
    let peer_id = peer_id.expect("handshake accepted without peer id");
    info!("[{}] connected from {}", peer_id, peer_addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    sessions.insert(peer_id.clone(), tx);
    handlers.connect(&peer_id);

    // Outgoing writer task.
    let send_peer = peer_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            debug!("[{}] -> {}", send_peer, message);
            if let Err(e) = ws_sender.send(Message::Text(message)).await {
                error!("[{}] send error: {}", send_peer, e);
                break;
            }
        }
    });

    // Incoming reader task.
    let recv_peer = peer_id.clone();
    let recv_handlers = handlers.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(message) = ws_receiver.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    debug!("[{}] <- {}", recv_peer, text);
                    recv_handlers.message(&recv_peer, &text);
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(frame)) => {
                    debug!("[{}] close frame received: {:?}", recv_peer, frame);
                    break;
                }
                Ok(Message::Binary(data)) => {
                    warn!("[{}] binary message received ({} bytes), ignoring", recv_peer, data.len());
                }
                Ok(Message::Frame(_)) => {}
                Err(e) => {
                    error!("[{}] WebSocket error: {}", recv_peer, e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
        _ = shutdown.notified().wait() => {
            debug!("[{}] closing due to server shutdown", peer_id);
        }
    }

    sessions.remove(&peer_id);
    handlers.disconnect(&peer_id);
    info!("[{}] disconnected", peer_id);

    Ok(())
}

// ── Client ─────────────────────────────────────────────────────

#[derive(Default)]
struct ClientHandlers {
    on_message: RwLock<Option<ClientMessageHandler>>,
    on_disconnect: RwLock<Option<DisconnectHandler>>,
}

/// WebSocket client transport for a charge point.
pub struct WsTransportClient {
    sender: RwLock<Option<mpsc::UnboundedSender<String>>>,
    handlers: Arc<ClientHandlers>,
    shutdown: ShutdownSignal,
}

impl WsTransportClient {
    pub fn new() -> Self {
        Self {
            sender: RwLock::new(None),
            handlers: Arc::new(ClientHandlers::default()),
            shutdown: ShutdownSignal::new(),
        }
    }
}

impl Default for WsTransportClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportClient for WsTransportClient {
    async fn start(&self, url: &str) -> Result<(), TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", OCPP_SUBPROTOCOL.parse().unwrap());

        let (ws_stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        info!("connected to central system at {}", url);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        *self.sender.write().unwrap() = Some(tx);

        let send_shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = rx.recv() => {
                        let Some(message) = message else { break };
                        if let Err(e) = ws_sender.send(Message::Text(message)).await {
                            error!("send error: {}", e);
                            break;
                        }
                    }
                    _ = send_shutdown.notified().wait() => {
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        let handlers = self.handlers.clone();
        let recv_shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = ws_receiver.next() => {
                        match message {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(handler) = handlers.on_message.read().unwrap().clone() {
                                    handler(&text);
                                }
                            }
                            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("WebSocket error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = recv_shutdown.notified().wait() => break,
                }
            }
            if let Some(handler) = handlers.on_disconnect.read().unwrap().clone() {
                handler();
            }
        });

        Ok(())
    }

    async fn stop(&self) {
        self.shutdown.trigger();
        *self.sender.write().unwrap() = None;
    }

    fn send(&self, message: String) -> Result<(), TransportError> {
        let guard = self.sender.read().unwrap();
        let sender = guard.as_ref().ok_or(TransportError::NotStarted)?;
        sender
            .send(message)
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn set_on_message(&self, handler: ClientMessageHandler) {
        *self.handlers.on_message.write().unwrap() = Some(handler);
    }

    fn set_on_disconnect(&self, handler: DisconnectHandler) {
        *self.handlers.on_disconnect.write().unwrap() = Some(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_pattern_extracts_id() {
        let pattern = PathPattern::parse("/ocpp/{id}").unwrap();
        assert_eq!(pattern.extract("/ocpp/CP001").as_deref(), Some("CP001"));
        assert_eq!(pattern.extract("/ocpp/"), None);
        assert_eq!(pattern.extract("/other/CP001"), None);
        assert_eq!(pattern.extract("/ocpp/a/b"), None);
    }

    #[test]
    fn path_pattern_with_suffix() {
        let pattern = PathPattern::parse("/ws/{id}/ocpp").unwrap();
        assert_eq!(pattern.extract("/ws/CP7/ocpp").as_deref(), Some("CP7"));
        assert_eq!(pattern.extract("/ws/CP7"), None);
    }

    #[test]
    fn pattern_without_placeholder_is_rejected() {
        assert!(matches!(
            PathPattern::parse("/ocpp/fixed"),
            Err(TransportError::InvalidPathPattern(_))
        ));
    }
}
