//! Multi-peer OCPP-J endpoint (central-system side).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::callback_queue::{CallCallback, CallbackQueue, SendFn};
use super::{CallCancellation, ERROR_CHANNEL_CAPACITY};
use crate::feature::{FeatureRegistry, Request, Response};
use crate::support::errors::{EndpointError, ErrorCode, OcppError};
use crate::support::ocpp_frame::OcppFrame;
use crate::transport::{PeerHandler, TransportServer};

/// Inbound CALL handler installed by the owning shell. Receives
/// `(peer_id, unique_id, request)`; replies via [`Server::reply`].
pub type RequestHandler = Arc<dyn Fn(String, String, Request) + Send + Sync>;

/// OCPP-J server endpoint: owns the feature registry, the per-peer call
/// queue and the transport adapter.
///
/// Handlers are installed once, before [`Server::start`]; the endpoint is
/// not reconfigured while running.
pub struct Server {
    transport: Arc<dyn TransportServer>,
    registry: Arc<FeatureRegistry>,
    queue: Arc<CallbackQueue>,
    call_sequence: AtomicU64,
    call_timeout: Option<Duration>,
    error_tx: mpsc::Sender<EndpointError>,
    error_rx: Mutex<Option<mpsc::Receiver<EndpointError>>>,
    request_handler: RwLock<Option<RequestHandler>>,
    connect_handler: RwLock<Option<PeerHandler>>,
    disconnect_handler: RwLock<Option<PeerHandler>>,
    stopped: AtomicBool,
}

impl Server {
    pub fn new(
        transport: Arc<dyn TransportServer>,
        registry: Arc<FeatureRegistry>,
        call_timeout: Option<Duration>,
    ) -> Self {
        let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        Self {
            transport,
            registry,
            queue: Arc::new(CallbackQueue::new()),
            call_sequence: AtomicU64::new(1),
            call_timeout,
            error_tx,
            error_rx: Mutex::new(Some(error_rx)),
            request_handler: RwLock::new(None),
            connect_handler: RwLock::new(None),
            disconnect_handler: RwLock::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    /// Install the inbound CALL handler. Must be called before `start`.
    pub fn set_request_handler(&self, handler: RequestHandler) {
        *self.request_handler.write().unwrap() = Some(handler);
    }

    /// Install the new-peer hook. Must be called before `start`.
    pub fn set_connect_handler(&self, handler: PeerHandler) {
        *self.connect_handler.write().unwrap() = Some(handler);
    }

    /// Install the peer-disconnect hook, invoked after the peer's
    /// outstanding calls have been cancelled. Must be called before `start`.
    pub fn set_disconnect_handler(&self, handler: PeerHandler) {
        *self.disconnect_handler.write().unwrap() = Some(handler);
    }

    /// Take the errors channel receiver. Single consumer: subsequent calls
    /// return `None`.
    pub fn errors(&self) -> Option<mpsc::Receiver<EndpointError>> {
        self.error_rx.lock().unwrap().take()
    }

    /// Bind the transport and start serving.
    pub async fn start(self: &Arc<Self>, port: u16, path_pattern: &str) -> Result<(), OcppError> {
        let endpoint = self.clone();
        self.transport.set_on_message(Arc::new(move |peer_id, text| {
            endpoint.handle_message(peer_id, text);
        }));
        let endpoint = self.clone();
        self.transport.set_on_disconnect(Arc::new(move |peer_id| {
            endpoint.handle_disconnect(peer_id);
        }));
        let endpoint = self.clone();
        self.transport.set_on_connect(Arc::new(move |peer_id| {
            let handler = endpoint.connect_handler.read().unwrap().clone();
            if let Some(handler) = handler {
                handler(peer_id);
            }
        }));
        self.transport
            .start(port, path_pattern)
            .await
            .map_err(|e| OcppError::generic(e.to_string()))
    }

    /// Cancel every peer's outstanding calls and stop the transport.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        for (peer_id, unique_id, callback) in self.queue.shutdown() {
            debug!(
                peer_id = peer_id.as_str(),
                message_id = unique_id.as_str(),
                "cancelling call on endpoint shutdown"
            );
            callback(Err(OcppError::generic(
                "endpoint stopped, no response received from client",
            )));
        }
        self.transport.stop().await;
    }

    fn next_unique_id(&self) -> String {
        format!("CS-{}", self.call_sequence.fetch_add(1, Ordering::SeqCst))
    }

    /// Queue an outbound CALL to `peer_id`.
    ///
    /// Acceptance means the callback will fire exactly once with a terminal
    /// outcome; it does not mean the frame is already on the wire.
    pub fn send_request(
        &self,
        peer_id: &str,
        request: Request,
        callback: CallCallback,
    ) -> Result<(), OcppError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(OcppError::generic("endpoint is stopped"));
        }
        let action = request.action();
        if self.registry.feature(action).is_none() {
            return Err(OcppError::new(
                ErrorCode::NotSupported,
                format!("feature {action} is unsupported (missing profile), cannot send request"),
            ));
        }
        let payload = request.to_payload()?;
        let unique_id = self.next_unique_id();
        let text = OcppFrame::Call {
            unique_id: unique_id.clone(),
            action: action.to_string(),
            payload,
        }
        .serialize();

        info!(
            peer_id,
            action,
            message_id = unique_id.as_str(),
            "queueing call"
        );
        metrics::counter!("ocpp_calls_total", "action" => action).increment(1);

        let transport = self.transport.clone();
        let send_peer = peer_id.to_string();
        let send: SendFn = Box::new(move || {
            transport
                .send(&send_peer, text)
                .map_err(|e| OcppError::generic(e.to_string()))
        });

        self.queue
            .try_queue(peer_id, unique_id.clone(), action, send, callback)
            .map_err(|_| OcppError::generic("endpoint is stopped"))?;

        if let Some(timeout) = self.call_timeout {
            let queue = self.queue.clone();
            let peer = peer_id.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(callback) = queue.cancel(&peer, &unique_id) {
                    warn!(
                        peer_id = peer.as_str(),
                        message_id = unique_id.as_str(),
                        "call timed out"
                    );
                    let cancellation = CallCancellation::timed_out(unique_id, timeout);
                    callback(Err(cancellation.into_error()));
                }
            });
        }
        Ok(())
    }

    /// Send a CALLRESULT for an earlier inbound CALL.
    pub fn send_response(
        &self,
        peer_id: &str,
        request_id: &str,
        response: &Response,
    ) -> Result<(), OcppError> {
        let payload = response.to_payload()?;
        let text = OcppFrame::CallResult {
            unique_id: request_id.to_string(),
            payload,
        }
        .serialize();
        self.transport
            .send(peer_id, text)
            .map_err(|e| OcppError::generic(e.to_string()))
    }

    /// Send a CALLERROR for an earlier inbound CALL.
    pub fn send_error(
        &self,
        peer_id: &str,
        request_id: &str,
        error: &OcppError,
    ) -> Result<(), OcppError> {
        metrics::counter!("ocpp_call_errors_total", "code" => error.code.as_str()).increment(1);
        let text = OcppFrame::CallError {
            unique_id: request_id.to_string(),
            error_code: error.code.as_str().to_string(),
            error_description: error.description.clone(),
            error_details: error.details.clone(),
        }
        .serialize();
        self.transport
            .send(peer_id, text)
            .map_err(|e| OcppError::generic(e.to_string()))
    }

    /// Deliver a handler outcome for an inbound CALL.
    ///
    /// `Ok(None)` is an empty confirmation: the peer gets a `GenericError`
    /// and the event is reported on the errors channel. Reply-send failures
    /// fall back to a default CALLERROR before escalating.
    pub fn reply(&self, peer_id: &str, request_id: &str, outcome: Result<Option<Response>, OcppError>) {
        match outcome {
            Err(error) => {
                if self.send_error(peer_id, request_id, &error).is_err() {
                    self.fallback_error(peer_id, request_id, "failed to send error reply");
                }
            }
            Ok(None) => {
                let report = EndpointError::EmptyConfirmation {
                    peer_id: peer_id.to_string(),
                    request_id: request_id.to_string(),
                };
                let _ = self.send_error(peer_id, request_id, &OcppError::generic(report.to_string()));
                self.report(report);
            }
            Ok(Some(response)) => {
                if self.send_response(peer_id, request_id, &response).is_err() {
                    self.fallback_error(peer_id, request_id, "failed to send response");
                }
            }
        }
    }

    /// Best-effort default CALLERROR after a failed reply; escalates on the
    /// errors channel when even that fails.
    fn fallback_error(&self, peer_id: &str, request_id: &str, reason: &str) {
        warn!(peer_id, request_id, reason, "reply failed, sending default error");
        let fallback = OcppError::internal("failed to process request");
        if self.send_error(peer_id, request_id, &fallback).is_err() {
            self.report(EndpointError::ReplyFailed {
                peer_id: peer_id.to_string(),
                request_id: request_id.to_string(),
                reason: reason.to_string(),
            });
        }
    }

    fn report(&self, error: EndpointError) {
        warn!("{}", error);
        // Bounded channel: drop on overflow to preserve liveness.
        let _ = self.error_tx.try_send(error);
    }

    /// Transport inbound driver.
    pub fn handle_message(&self, peer_id: &str, text: &str) {
        match OcppFrame::parse(text) {
            Ok(OcppFrame::Call {
                unique_id,
                action,
                payload,
            }) => self.handle_call(peer_id, unique_id, action, payload),
            Ok(OcppFrame::CallResult { unique_id, payload }) => {
                self.handle_call_result(peer_id, unique_id, payload)
            }
            Ok(OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            }) => {
                let error = OcppError::new(ErrorCode::from_wire(&error_code), error_description)
                    .with_details(error_details);
                self.handle_call_error(peer_id, unique_id, error)
            }
            Err(frame_error) => {
                warn!(peer_id, error = %frame_error, "dropping malformed frame");
                if let Some(unique_id) = OcppFrame::salvage_unique_id(text) {
                    let error = OcppError::new(frame_error.error_code(), frame_error.to_string());
                    if self.send_error(peer_id, &unique_id, &error).is_err() {
                        self.report(EndpointError::ReplyFailed {
                            peer_id: peer_id.to_string(),
                            request_id: unique_id,
                            reason: "failed to reply to malformed frame".to_string(),
                        });
                    }
                }
            }
        }
    }

    fn handle_call(&self, peer_id: &str, unique_id: String, action: String, payload: serde_json::Value) {
        metrics::counter!("ocpp_inbound_calls_total").increment(1);
        match self.registry.decode_request(&action, payload) {
            Ok(request) => {
                let handler = self.request_handler.read().unwrap().clone();
                match handler {
                    Some(handler) => handler(peer_id.to_string(), unique_id, request),
                    None => {
                        let error = OcppError::new(
                            ErrorCode::NotSupported,
                            format!("unsupported action {action} on central system"),
                        );
                        if self.send_error(peer_id, &unique_id, &error).is_err() {
                            self.fallback_error(peer_id, &unique_id, "failed to send error reply");
                        }
                    }
                }
            }
            Err(error) => {
                debug!(peer_id, action = action.as_str(), code = %error.code, "rejecting inbound call");
                if self.send_error(peer_id, &unique_id, &error).is_err() {
                    self.fallback_error(peer_id, &unique_id, "failed to send error reply");
                }
            }
        }
    }

    fn handle_call_result(&self, peer_id: &str, unique_id: String, payload: serde_json::Value) {
        match self.queue.dequeue(peer_id, &unique_id) {
            Some(pending) => {
                metrics::histogram!("ocpp_call_roundtrip_seconds", "action" => pending.action)
                    .record(pending.sent_at.elapsed().as_secs_f64());
                let outcome = self.registry.decode_response(pending.action, payload);
                (pending.callback)(outcome);
            }
            None => self.report(EndpointError::OrphanResponse {
                peer_id: peer_id.to_string(),
                kind: "CallResult",
                request_id: unique_id,
            }),
        }
    }

    fn handle_call_error(&self, peer_id: &str, unique_id: String, error: OcppError) {
        match self.queue.dequeue(peer_id, &unique_id) {
            Some(pending) => (pending.callback)(Err(error)),
            None => self.report(EndpointError::OrphanResponse {
                peer_id: peer_id.to_string(),
                kind: "CallError",
                request_id: unique_id,
            }),
        }
    }

    /// Cancel the peer's outstanding calls in submission order, then forward
    /// the disconnect to the owner. Idempotent per disconnect.
    pub fn handle_disconnect(&self, peer_id: &str) {
        let drained = self.queue.dequeue_all(peer_id);
        if !drained.is_empty() {
            info!(peer_id, count = drained.len(), "cancelling calls for disconnected peer");
        }
        for (unique_id, callback) in drained {
            debug!(peer_id, message_id = unique_id.as_str(), "cancelled by disconnect");
            callback(Err(OcppError::client_disconnected()));
        }
        let handler = self.disconnect_handler.read().unwrap().clone();
        if let Some(handler) = handler {
            handler(peer_id);
        }
    }
}
