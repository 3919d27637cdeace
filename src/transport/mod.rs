//! Framed duplex transport contract consumed by the OCPP-J endpoints.
//!
//! The endpoints never talk to sockets directly: a [`TransportServer`] or
//! [`TransportClient`] delivers text frames and peer lifecycle events. A
//! WebSocket implementation over tokio-tungstenite ships in [`ws`]; tests
//! use the in-memory [`mock`] transport.

pub mod ws;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Callback invoked with a peer id (connect/disconnect events).
pub type PeerHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback invoked with `(peer_id, text_frame)` for server transports.
pub type ServerMessageHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Callback invoked with a text frame for client transports.
pub type ClientMessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback invoked when the client's connection goes away.
pub type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// Pre-acceptance validation of a connecting peer id. Returning `false`
/// rejects the connection during the handshake.
pub type ClientValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer not connected: {0}")]
    NotConnected(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("bind failed: {0}")]
    Bind(String),
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("transport not started")]
    NotStarted,
    #[error("invalid path pattern: {0}")]
    InvalidPathPattern(String),
}

/// Multi-peer server transport (central-system side).
///
/// Handlers must be registered before `start`; the transport invokes them
/// from its own tasks.
#[async_trait]
pub trait TransportServer: Send + Sync {
    /// Bind and start accepting connections. `path_pattern` contains an
    /// `{id}` placeholder naming the peer-id segment, e.g. `/ocpp/{id}`.
    async fn start(&self, port: u16, path_pattern: &str) -> Result<(), TransportError>;

    /// Stop accepting and close every live connection.
    async fn stop(&self);

    /// Send one text frame to a connected peer.
    fn send(&self, peer_id: &str, message: String) -> Result<(), TransportError>;

    fn set_on_connect(&self, handler: PeerHandler);
    fn set_on_disconnect(&self, handler: PeerHandler);
    fn set_on_message(&self, handler: ServerMessageHandler);
    fn set_validate_client(&self, validator: ClientValidator);
}

/// Single-peer client transport (charge-point side).
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Connect to the given URL.
    async fn start(&self, url: &str) -> Result<(), TransportError>;

    /// Close the connection.
    async fn stop(&self);

    /// Send one text frame.
    fn send(&self, message: String) -> Result<(), TransportError>;

    fn set_on_message(&self, handler: ClientMessageHandler);
    fn set_on_disconnect(&self, handler: DisconnectHandler);
}
