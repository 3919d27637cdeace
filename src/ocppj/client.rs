//! Single-peer OCPP-J endpoint (charge-point side).

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
use crate::transport::{DisconnectHandler, TransportClient};

/// Internal queue key: the client talks to exactly one peer.
const CENTRAL_SYSTEM: &str = "central-system";

/// Inbound CALL handler installed by the owning shell. Receives
/// `(unique_id, request)`; replies via [`Client::reply`].
pub type RequestHandler = Arc<dyn Fn(String, Request) + Send + Sync>;

/// OCPP-J client endpoint. Same queueing and correlation discipline as
/// [`super::Server`], for a single peer.
pub struct Client {
    transport: Arc<dyn TransportClient>,
    registry: Arc<FeatureRegistry>,
    queue: Arc<CallbackQueue>,
    call_sequence: AtomicU64,
    call_timeout: Option<Duration>,
    error_tx: mpsc::Sender<EndpointError>,
    error_rx: Mutex<Option<mpsc::Receiver<EndpointError>>>,
    request_handler: RwLock<Option<RequestHandler>>,
    disconnect_handler: RwLock<Option<DisconnectHandler>>,
    stopped: AtomicBool,
}

impl Client {
    pub fn new(
        transport: Arc<dyn TransportClient>,
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

    /// Install the disconnect hook, invoked after outstanding calls have
    /// been cancelled. Must be called before `start`.
    pub fn set_disconnect_handler(&self, handler: DisconnectHandler) {
        *self.disconnect_handler.write().unwrap() = Some(handler);
    }

    /// Take the errors channel receiver. Single consumer.
    pub fn errors(&self) -> Option<mpsc::Receiver<EndpointError>> {
        self.error_rx.lock().unwrap().take()
    }

    /// Connect to the central system.
    pub async fn start(self: &Arc<Self>, url: &str) -> Result<(), OcppError> {
        let endpoint = self.clone();
        self.transport.set_on_message(Arc::new(move |text| {
            endpoint.handle_message(text);
        }));
        let endpoint = self.clone();
        self.transport.set_on_disconnect(Arc::new(move || {
            endpoint.handle_disconnect();
        }));
        self.transport
            .start(url)
            .await
            .map_err(|e| OcppError::generic(e.to_string()))
    }

    /// Cancel outstanding calls and close the connection.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        for (_, unique_id, callback) in self.queue.shutdown() {
            debug!(
                message_id = unique_id.as_str(),
                "cancelling call on endpoint shutdown"
            );
            callback(Err(OcppError::generic(
                "endpoint stopped, no response received from central system",
            )));
        }
        self.transport.stop().await;
    }

    fn next_unique_id(&self) -> String {
        format!("CP-{}", self.call_sequence.fetch_add(1, Ordering::SeqCst))
    }

    /// Queue an outbound CALL. Same acceptance semantics as the server
    /// endpoint.
    pub fn send_request(&self, request: Request, callback: CallCallback) -> Result<(), OcppError> {
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

        info!(action, message_id = unique_id.as_str(), "queueing call");
        metrics::counter!("ocpp_calls_total", "action" => action).increment(1);

        let transport = self.transport.clone();
        let send: SendFn = Box::new(move || {
            transport
                .send(text)
                .map_err(|e| OcppError::generic(e.to_string()))
        });

        self.queue
            .try_queue(CENTRAL_SYSTEM, unique_id.clone(), action, send, callback)
            .map_err(|_| OcppError::generic("endpoint is stopped"))?;

        if let Some(timeout) = self.call_timeout {
            let queue = self.queue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(callback) = queue.cancel(CENTRAL_SYSTEM, &unique_id) {
                    warn!(message_id = unique_id.as_str(), "call timed out");
                    let cancellation = CallCancellation::timed_out(unique_id, timeout);
                    callback(Err(cancellation.into_error()));
                }
            });
        }
        Ok(())
    }

    /// Send a CALLRESULT for an earlier inbound CALL.
    pub fn send_response(&self, request_id: &str, response: &Response) -> Result<(), OcppError> {
        let payload = response.to_payload()?;
        let text = OcppFrame::CallResult {
            unique_id: request_id.to_string(),
            payload,
        }
        .serialize();
        self.transport
            .send(text)
            .map_err(|e| OcppError::generic(e.to_string()))
    }

    /// Send a CALLERROR for an earlier inbound CALL.
    pub fn send_error(&self, request_id: &str, error: &OcppError) -> Result<(), OcppError> {
        metrics::counter!("ocpp_call_errors_total", "code" => error.code.as_str()).increment(1);
        let text = OcppFrame::CallError {
            unique_id: request_id.to_string(),
            error_code: error.code.as_str().to_string(),
            error_description: error.description.clone(),
            error_details: error.details.clone(),
        }
        .serialize();
        self.transport
            .send(text)
            .map_err(|e| OcppError::generic(e.to_string()))
    }

    /// Deliver a handler outcome for an inbound CALL; mirrors
    /// [`super::Server::reply`].
    pub fn reply(&self, request_id: &str, outcome: Result<Option<Response>, OcppError>) {
        match outcome {
            Err(error) => {
                if self.send_error(request_id, &error).is_err() {
                    self.fallback_error(request_id, "failed to send error reply");
                }
            }
            Ok(None) => {
                let report = EndpointError::EmptyConfirmation {
                    peer_id: CENTRAL_SYSTEM.to_string(),
                    request_id: request_id.to_string(),
                };
                let _ = self.send_error(request_id, &OcppError::generic(report.to_string()));
                self.report(report);
            }
            Ok(Some(response)) => {
                if self.send_response(request_id, &response).is_err() {
                    self.fallback_error(request_id, "failed to send response");
                }
            }
        }
    }

    fn fallback_error(&self, request_id: &str, reason: &str) {
        warn!(request_id, reason, "reply failed, sending default error");
        let fallback = OcppError::internal("failed to process request");
        if self.send_error(request_id, &fallback).is_err() {
            self.report(EndpointError::ReplyFailed {
                peer_id: CENTRAL_SYSTEM.to_string(),
                request_id: request_id.to_string(),
                reason: reason.to_string(),
            });
        }
    }

    fn report(&self, error: EndpointError) {
        warn!("{}", error);
        let _ = self.error_tx.try_send(error);
    }

    /// Transport inbound driver.
    pub fn handle_message(&self, text: &str) {
        match OcppFrame::parse(text) {
            Ok(OcppFrame::Call {
                unique_id,
                action,
                payload,
            }) => self.handle_call(unique_id, action, payload),
            Ok(OcppFrame::CallResult { unique_id, payload }) => {
                self.handle_call_result(unique_id, payload)
            }
            Ok(OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            }) => {
                let error = OcppError::new(ErrorCode::from_wire(&error_code), error_description)
                    .with_details(error_details);
                self.handle_call_error(unique_id, error)
            }
            Err(frame_error) => {
                warn!(error = %frame_error, "dropping malformed frame");
                if let Some(unique_id) = OcppFrame::salvage_unique_id(text) {
                    let error = OcppError::new(frame_error.error_code(), frame_error.to_string());
                    if self.send_error(&unique_id, &error).is_err() {
                        self.report(EndpointError::ReplyFailed {
                            peer_id: CENTRAL_SYSTEM.to_string(),
                            request_id: unique_id,
                            reason: "failed to reply to malformed frame".to_string(),
                        });
                    }
                }
            }
        }
    }

    fn handle_call(&self, unique_id: String, action: String, payload: serde_json::Value) {
        metrics::counter!("ocpp_inbound_calls_total").increment(1);
        match self.registry.decode_request(&action, payload) {
            Ok(request) => {
                let handler = self.request_handler.read().unwrap().clone();
                match handler {
                    Some(handler) => handler(unique_id, request),
                    None => {
                        let error = OcppError::new(
                            ErrorCode::NotSupported,
                            format!("unsupported action {action} on charge point"),
                        );
                        if self.send_error(&unique_id, &error).is_err() {
                            self.fallback_error(&unique_id, "failed to send error reply");
                        }
                    }
                }
            }
            Err(error) => {
                debug!(action = action.as_str(), code = %error.code, "rejecting inbound call");
                if self.send_error(&unique_id, &error).is_err() {
                    self.fallback_error(&unique_id, "failed to send error reply");
                }
            }
        }
    }

    fn handle_call_result(&self, unique_id: String, payload: serde_json::Value) {
        match self.queue.dequeue(CENTRAL_SYSTEM, &unique_id) {
            Some(pending) => {
                metrics::histogram!("ocpp_call_roundtrip_seconds", "action" => pending.action)
                    .record(pending.sent_at.elapsed().as_secs_f64());
                let outcome = self.registry.decode_response(pending.action, payload);
                (pending.callback)(outcome);
            }
            None => self.report(EndpointError::OrphanResponse {
                peer_id: CENTRAL_SYSTEM.to_string(),
                kind: "CallResult",
                request_id: unique_id,
            }),
        }
    }

    fn handle_call_error(&self, unique_id: String, error: OcppError) {
        match self.queue.dequeue(CENTRAL_SYSTEM, &unique_id) {
            Some(pending) => (pending.callback)(Err(error)),
            None => self.report(EndpointError::OrphanResponse {
                peer_id: CENTRAL_SYSTEM.to_string(),
                kind: "CallError",
                request_id: unique_id,
            }),
        }
    }

    /// Cancel outstanding calls in submission order, then forward the
    /// disconnect to the owner.
    pub fn handle_disconnect(&self) {
        let drained = self.queue.dequeue_all(CENTRAL_SYSTEM);
        if !drained.is_empty() {
            info!(count = drained.len(), "cancelling calls after disconnect");
        }
        for (unique_id, callback) in drained {
            debug!(message_id = unique_id.as_str(), "cancelled by disconnect");
            callback(Err(OcppError::generic(
                "connection to central system lost, no response received",
            )));
        }
        let handler = self.disconnect_handler.read().unwrap().clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}
