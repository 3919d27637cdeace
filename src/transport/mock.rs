//! In-memory transports for endpoint tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use super::{
    ClientMessageHandler, ClientValidator, DisconnectHandler, PeerHandler, ServerMessageHandler,
    TransportClient, TransportError, TransportServer,
};

/// Scriptable server transport: records outbound frames, lets tests inject
/// inbound frames and disconnects.
#[derive(Default)]
pub struct MockServerTransport {
    sent: Mutex<Vec<(String, String)>>,
    fail_sends: AtomicBool,
    on_connect: RwLock<Option<PeerHandler>>,
    on_disconnect: RwLock<Option<PeerHandler>>,
    on_message: RwLock<Option<ServerMessageHandler>>,
    validate_client: RwLock<Option<ClientValidator>>,
}

impl MockServerTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All frames sent so far as `(peer_id, text)` pairs.
    pub fn sent_frames(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Frames sent to one peer.
    pub fn frames_to(&self, peer_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(peer, _)| peer == peer_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Make subsequent `send` calls fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Deliver an inbound frame from `peer_id`.
    pub fn inject_message(&self, peer_id: &str, text: &str) {
        let handler = self.on_message.read().unwrap().clone();
        if let Some(handler) = handler {
            handler(peer_id, text);
        }
    }

    /// Report `peer_id` as connected.
    pub fn inject_connect(&self, peer_id: &str) {
        let handler = self.on_connect.read().unwrap().clone();
        if let Some(handler) = handler {
            handler(peer_id);
        }
    }

    /// Report `peer_id` as disconnected.
    pub fn inject_disconnect(&self, peer_id: &str) {
        let handler = self.on_disconnect.read().unwrap().clone();
        if let Some(handler) = handler {
            handler(peer_id);
        }
    }

    /// Run the registered client validator, as the handshake would.
    pub fn validate(&self, peer_id: &str) -> bool {
        match self.validate_client.read().unwrap().clone() {
            Some(validator) => validator(peer_id),
            None => true,
        }
    }
}

#[async_trait]
impl TransportServer for MockServerTransport {
    async fn start(&self, _port: u16, _path_pattern: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop(&self) {}

    fn send(&self, peer_id: &str, message: String) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("mock failure".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((peer_id.to_string(), message));
        Ok(())
    }

    fn set_on_connect(&self, handler: PeerHandler) {
        *self.on_connect.write().unwrap() = Some(handler);
    }

    fn set_on_disconnect(&self, handler: PeerHandler) {
        *self.on_disconnect.write().unwrap() = Some(handler);
    }

    fn set_on_message(&self, handler: ServerMessageHandler) {
        *self.on_message.write().unwrap() = Some(handler);
    }

    fn set_validate_client(&self, validator: ClientValidator) {
        *self.validate_client.write().unwrap() = Some(validator);
    }
}

/// Scriptable client transport, mirroring [`MockServerTransport`].
#[derive(Default)]
pub struct MockClientTransport {
    sent: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
    on_message: RwLock<Option<ClientMessageHandler>>,
    on_disconnect: RwLock<Option<DisconnectHandler>>,
}

impl MockClientTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn inject_message(&self, text: &str) {
        let handler = self.on_message.read().unwrap().clone();
        if let Some(handler) = handler {
            handler(text);
        }
    }

    pub fn inject_disconnect(&self) {
        let handler = self.on_disconnect.read().unwrap().clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

#[async_trait]
impl TransportClient for MockClientTransport {
    async fn start(&self, _url: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop(&self) {}

    fn send(&self, message: String) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("mock failure".into()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn set_on_message(&self, handler: ClientMessageHandler) {
        *self.on_message.write().unwrap() = Some(handler);
    }

    fn set_on_disconnect(&self, handler: DisconnectHandler) {
        *self.on_disconnect.write().unwrap() = Some(handler);
    }
}
