//! Central-system shell: typed facade over the OCPP-J server endpoint.
//!
//! One method per CS→CP action, per-profile handler traits for inbound
//! charge-point calls, builder-style construction (profiles, handlers and
//! hooks are fixed before `start`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::messages::cancel_reservation::{
    CancelReservationRequest, CancelReservationResponse,
};
use rust_ocpp::v1_6::messages::change_availability::{
    ChangeAvailabilityRequest, ChangeAvailabilityResponse,
};
use rust_ocpp::v1_6::messages::change_configuration::{
    ChangeConfigurationRequest, ChangeConfigurationResponse,
};
use rust_ocpp::v1_6::messages::clear_cache::{ClearCacheRequest, ClearCacheResponse};
use rust_ocpp::v1_6::messages::clear_charging_profile::{
    ClearChargingProfileRequest, ClearChargingProfileResponse,
};
use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::messages::diagnostics_status_notification::{
    DiagnosticsStatusNotificationRequest, DiagnosticsStatusNotificationResponse,
};
use rust_ocpp::v1_6::messages::firmware_status_notification::{
    FirmwareStatusNotificationRequest, FirmwareStatusNotificationResponse,
};
use rust_ocpp::v1_6::messages::get_composite_schedule::{
    GetCompositeScheduleRequest, GetCompositeScheduleResponse,
};
use rust_ocpp::v1_6::messages::get_configuration::{
    GetConfigurationRequest, GetConfigurationResponse,
};
use rust_ocpp::v1_6::messages::get_diagnostics::{GetDiagnosticsRequest, GetDiagnosticsResponse};
use rust_ocpp::v1_6::messages::get_local_list_version::{
    GetLocalListVersionRequest, GetLocalListVersionResponse,
};
use rust_ocpp::v1_6::messages::heart_beat::{HeartbeatRequest, HeartbeatResponse};
use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use rust_ocpp::v1_6::messages::remote_start_transaction::{
    RemoteStartTransactionRequest, RemoteStartTransactionResponse,
};
use rust_ocpp::v1_6::messages::remote_stop_transaction::{
    RemoteStopTransactionRequest, RemoteStopTransactionResponse,
};
use rust_ocpp::v1_6::messages::reserve_now::{ReserveNowRequest, ReserveNowResponse};
use rust_ocpp::v1_6::messages::reset::{ResetRequest, ResetResponse};
use rust_ocpp::v1_6::messages::send_local_list::{SendLocalListRequest, SendLocalListResponse};
use rust_ocpp::v1_6::messages::set_charging_profile::{
    SetChargingProfileRequest, SetChargingProfileResponse,
};
use rust_ocpp::v1_6::messages::start_transaction::{
    StartTransactionRequest, StartTransactionResponse,
};
use rust_ocpp::v1_6::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use rust_ocpp::v1_6::messages::stop_transaction::{
    StopTransactionRequest, StopTransactionResponse,
};
use rust_ocpp::v1_6::messages::trigger_message::{TriggerMessageRequest, TriggerMessageResponse};
use rust_ocpp::v1_6::messages::unlock_connector::{
    UnlockConnectorRequest, UnlockConnectorResponse,
};
use rust_ocpp::v1_6::messages::update_firmware::{UpdateFirmwareRequest, UpdateFirmwareResponse};

use crate::config::CentralSystemConfig;
use crate::feature::{
    certificates, core, extended_trigger, firmware, local_auth, logging, remote_trigger,
    reservation, secure_firmware, security, smart_charging, FeatureRegistry, Profile, Request,
    Response, Role,
};
use crate::messages::certificate_signed::{CertificateSignedRequest, CertificateSignedResponse};
use crate::messages::delete_certificate::{DeleteCertificateRequest, DeleteCertificateResponse};
use crate::messages::extended_trigger_message::{
    ExtendedTriggerMessageRequest, ExtendedTriggerMessageResponse,
};
use crate::messages::get_installed_certificate_ids::{
    GetInstalledCertificateIdsRequest, GetInstalledCertificateIdsResponse,
};
use crate::messages::get_log::{GetLogRequest, GetLogResponse};
use crate::messages::install_certificate::{
    InstallCertificateRequest, InstallCertificateResponse,
};
use crate::messages::log_status_notification::{
    LogStatusNotificationRequest, LogStatusNotificationResponse,
};
use crate::messages::security_event_notification::{
    SecurityEventNotificationRequest, SecurityEventNotificationResponse,
};
use crate::messages::sign_certificate::{SignCertificateRequest, SignCertificateResponse};
use crate::messages::signed_firmware_status_notification::{
    SignedFirmwareStatusNotificationRequest, SignedFirmwareStatusNotificationResponse,
};
use crate::messages::signed_update_firmware::{
    SignedUpdateFirmwareRequest, SignedUpdateFirmwareResponse,
};
use crate::ocppj::{self, unexpected_response, CallOutcome, HandlerResult};
use crate::support::errors::{EndpointError, ErrorCode, OcppError};
use crate::transport::ws::WsTransportServer;
use crate::transport::{ClientValidator, PeerHandler, TransportServer};

fn not_supported(action: &str) -> OcppError {
    OcppError::new(
        ErrorCode::NotSupported,
        format!("unsupported action {action} on central system"),
    )
}

// ── Inbound handler traits ─────────────────────────────────────
//
// One trait per profile with charge-point-initiated features. Every method
// has a NotSupported default, so implementations only override what they
// actually handle.

/// Core profile handler (charge-point-initiated features).
#[async_trait]
pub trait CoreHandler: Send + Sync {
    async fn on_authorize(
        &self,
        charge_point_id: &str,
        request: AuthorizeRequest,
    ) -> HandlerResult<AuthorizeResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(core::AUTHORIZE))
    }

    async fn on_boot_notification(
        &self,
        charge_point_id: &str,
        request: BootNotificationRequest,
    ) -> HandlerResult<BootNotificationResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(core::BOOT_NOTIFICATION))
    }

    async fn on_data_transfer(
        &self,
        charge_point_id: &str,
        request: DataTransferRequest,
    ) -> HandlerResult<DataTransferResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(core::DATA_TRANSFER))
    }

    async fn on_heartbeat(
        &self,
        charge_point_id: &str,
        request: HeartbeatRequest,
    ) -> HandlerResult<HeartbeatResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(core::HEARTBEAT))
    }

    async fn on_meter_values(
        &self,
        charge_point_id: &str,
        request: MeterValuesRequest,
    ) -> HandlerResult<MeterValuesResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(core::METER_VALUES))
    }

    async fn on_start_transaction(
        &self,
        charge_point_id: &str,
        request: StartTransactionRequest,
    ) -> HandlerResult<StartTransactionResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(core::START_TRANSACTION))
    }

    async fn on_status_notification(
        &self,
        charge_point_id: &str,
        request: StatusNotificationRequest,
    ) -> HandlerResult<StatusNotificationResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(core::STATUS_NOTIFICATION))
    }

    async fn on_stop_transaction(
        &self,
        charge_point_id: &str,
        request: StopTransactionRequest,
    ) -> HandlerResult<StopTransactionResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(core::STOP_TRANSACTION))
    }
}

/// FirmwareManagement profile handler.
#[async_trait]
pub trait FirmwareHandler: Send + Sync {
    async fn on_diagnostics_status_notification(
        &self,
        charge_point_id: &str,
        request: DiagnosticsStatusNotificationRequest,
    ) -> HandlerResult<DiagnosticsStatusNotificationResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(firmware::DIAGNOSTICS_STATUS_NOTIFICATION))
    }

    async fn on_firmware_status_notification(
        &self,
        charge_point_id: &str,
        request: FirmwareStatusNotificationRequest,
    ) -> HandlerResult<FirmwareStatusNotificationResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(firmware::FIRMWARE_STATUS_NOTIFICATION))
    }
}

/// Security profile handler.
#[async_trait]
pub trait SecurityHandler: Send + Sync {
    async fn on_sign_certificate(
        &self,
        charge_point_id: &str,
        request: SignCertificateRequest,
    ) -> HandlerResult<SignCertificateResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(security::SIGN_CERTIFICATE))
    }

    async fn on_security_event_notification(
        &self,
        charge_point_id: &str,
        request: SecurityEventNotificationRequest,
    ) -> HandlerResult<SecurityEventNotificationResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(security::SECURITY_EVENT_NOTIFICATION))
    }
}

/// Logging profile handler.
#[async_trait]
pub trait LogHandler: Send + Sync {
    async fn on_log_status_notification(
        &self,
        charge_point_id: &str,
        request: LogStatusNotificationRequest,
    ) -> HandlerResult<LogStatusNotificationResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(logging::LOG_STATUS_NOTIFICATION))
    }
}

/// SecureFirmwareUpdate profile handler.
#[async_trait]
pub trait SecureFirmwareHandler: Send + Sync {
    async fn on_signed_firmware_status_notification(
        &self,
        charge_point_id: &str,
        request: SignedFirmwareStatusNotificationRequest,
    ) -> HandlerResult<SignedFirmwareStatusNotificationResponse> {
        let _ = (charge_point_id, request);
        Err(not_supported(
            secure_firmware::SIGNED_FIRMWARE_STATUS_NOTIFICATION,
        ))
    }
}

#[derive(Default)]
struct InboundHandlers {
    core: Option<Arc<dyn CoreHandler>>,
    firmware: Option<Arc<dyn FirmwareHandler>>,
    security: Option<Arc<dyn SecurityHandler>>,
    log: Option<Arc<dyn LogHandler>>,
    secure_firmware: Option<Arc<dyn SecureFirmwareHandler>>,
}

/// Route an inbound request to the matching profile handler.
async fn invoke(
    handlers: &InboundHandlers,
    peer_id: &str,
    request: Request,
) -> Result<Option<Response>, OcppError> {
    match request {
        Request::Authorize(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::AUTHORIZE));
            };
            handler
                .on_authorize(peer_id, request)
                .await
                .map(|r| r.map(Response::Authorize))
        }
        Request::BootNotification(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::BOOT_NOTIFICATION));
            };
            handler
                .on_boot_notification(peer_id, request)
                .await
                .map(|r| r.map(Response::BootNotification))
        }
        Request::DataTransfer(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::DATA_TRANSFER));
            };
            handler
                .on_data_transfer(peer_id, request)
                .await
                .map(|r| r.map(Response::DataTransfer))
        }
        Request::Heartbeat(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::HEARTBEAT));
            };
            handler
                .on_heartbeat(peer_id, request)
                .await
                .map(|r| r.map(Response::Heartbeat))
        }
        Request::MeterValues(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::METER_VALUES));
            };
            handler
                .on_meter_values(peer_id, request)
                .await
                .map(|r| r.map(Response::MeterValues))
        }
        Request::StartTransaction(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::START_TRANSACTION));
            };
            handler
                .on_start_transaction(peer_id, request)
                .await
                .map(|r| r.map(Response::StartTransaction))
        }
        Request::StatusNotification(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::STATUS_NOTIFICATION));
            };
            handler
                .on_status_notification(peer_id, request)
                .await
                .map(|r| r.map(Response::StatusNotification))
        }
        Request::StopTransaction(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::STOP_TRANSACTION));
            };
            handler
                .on_stop_transaction(peer_id, request)
                .await
                .map(|r| r.map(Response::StopTransaction))
        }
        Request::DiagnosticsStatusNotification(request) => {
            let Some(handler) = handlers.firmware.clone() else {
                return Err(not_supported(firmware::DIAGNOSTICS_STATUS_NOTIFICATION));
            };
            handler
                .on_diagnostics_status_notification(peer_id, request)
                .await
                .map(|r| r.map(Response::DiagnosticsStatusNotification))
        }
        Request::FirmwareStatusNotification(request) => {
            let Some(handler) = handlers.firmware.clone() else {
                return Err(not_supported(firmware::FIRMWARE_STATUS_NOTIFICATION));
            };
            handler
                .on_firmware_status_notification(peer_id, request)
                .await
                .map(|r| r.map(Response::FirmwareStatusNotification))
        }
        Request::SignCertificate(request) => {
            let Some(handler) = handlers.security.clone() else {
                return Err(not_supported(security::SIGN_CERTIFICATE));
            };
            handler
                .on_sign_certificate(peer_id, request)
                .await
                .map(|r| r.map(Response::SignCertificate))
        }
        Request::SecurityEventNotification(request) => {
            let Some(handler) = handlers.security.clone() else {
                return Err(not_supported(security::SECURITY_EVENT_NOTIFICATION));
            };
            handler
                .on_security_event_notification(peer_id, request)
                .await
                .map(|r| r.map(Response::SecurityEventNotification))
        }
        Request::LogStatusNotification(request) => {
            let Some(handler) = handlers.log.clone() else {
                return Err(not_supported(logging::LOG_STATUS_NOTIFICATION));
            };
            handler
                .on_log_status_notification(peer_id, request)
                .await
                .map(|r| r.map(Response::LogStatusNotification))
        }
        Request::SignedFirmwareStatusNotification(request) => {
            let Some(handler) = handlers.secure_firmware.clone() else {
                return Err(not_supported(
                    secure_firmware::SIGNED_FIRMWARE_STATUS_NOTIFICATION,
                ));
            };
            handler
                .on_signed_firmware_status_notification(peer_id, request)
                .await
                .map(|r| r.map(Response::SignedFirmwareStatusNotification))
        }
        // CS→CP actions arriving from a charge point.
        other => Err(not_supported(other.action())),
    }
}

// ── Builder ────────────────────────────────────────────────────

/// Builder for a [`CentralSystem`]. Profiles, handlers and hooks cannot
/// change once `build` has run.
pub struct CentralSystemBuilder {
    config: CentralSystemConfig,
    profiles: Vec<Profile>,
    call_timeout: Option<Duration>,
    transport: Option<Arc<dyn TransportServer>>,
    handlers: InboundHandlers,
    on_connect: Option<PeerHandler>,
    on_disconnect: Option<PeerHandler>,
    validate_client: Option<ClientValidator>,
}

impl CentralSystemBuilder {
    pub fn new(config: CentralSystemConfig) -> Self {
        let call_timeout = config.call_timeout();
        Self {
            config,
            profiles: Profile::ALL.to_vec(),
            call_timeout,
            transport: None,
            handlers: InboundHandlers::default(),
            on_connect: None,
            on_disconnect: None,
            validate_client: None,
        }
    }

    /// Restrict the enabled feature profiles (default: all).
    pub fn with_profiles(mut self, profiles: &[Profile]) -> Self {
        self.profiles = profiles.to_vec();
        self
    }

    /// Override the per-call timeout from the configuration.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Use a custom transport instead of the WebSocket server.
    pub fn with_transport(mut self, transport: Arc<dyn TransportServer>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_core_handler(mut self, handler: Arc<dyn CoreHandler>) -> Self {
        self.handlers.core = Some(handler);
        self
    }

    pub fn with_firmware_handler(mut self, handler: Arc<dyn FirmwareHandler>) -> Self {
        self.handlers.firmware = Some(handler);
        self
    }

    pub fn with_security_handler(mut self, handler: Arc<dyn SecurityHandler>) -> Self {
        self.handlers.security = Some(handler);
        self
    }

    pub fn with_log_handler(mut self, handler: Arc<dyn LogHandler>) -> Self {
        self.handlers.log = Some(handler);
        self
    }

    pub fn with_secure_firmware_handler(mut self, handler: Arc<dyn SecureFirmwareHandler>) -> Self {
        self.handlers.secure_firmware = Some(handler);
        self
    }

    /// Hook invoked when a charge point connects.
    pub fn on_connect(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(hook));
        self
    }

    /// Hook invoked after a charge point disconnects and its outstanding
    /// calls have been cancelled.
    pub fn on_disconnect(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(hook));
        self
    }

    /// Handshake-time validation of connecting charge points.
    pub fn with_client_validator(
        mut self,
        validator: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validate_client = Some(Arc::new(validator));
        self
    }

    pub fn build(self) -> CentralSystem {
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(WsTransportServer::new().with_bind_host(self.config.host.clone()))
        });
        let registry = Arc::new(FeatureRegistry::with_profiles(&self.profiles));
        let endpoint = Arc::new(ocppj::Server::new(
            transport.clone(),
            registry,
            self.call_timeout,
        ));

        if let Some(validator) = self.validate_client {
            transport.set_validate_client(validator);
        }
        if let Some(hook) = self.on_connect {
            endpoint.set_connect_handler(hook);
        }
        if let Some(hook) = self.on_disconnect {
            endpoint.set_disconnect_handler(hook);
        }

        let handlers = Arc::new(self.handlers);
        let dispatch_endpoint = endpoint.clone();
        let dispatch_handlers = handlers.clone();
        endpoint.set_request_handler(Arc::new(move |peer_id, unique_id, request| {
            let endpoint = dispatch_endpoint.clone();
            let handlers = dispatch_handlers.clone();
            debug!(
                charge_point_id = peer_id.as_str(),
                action = request.action(),
                message_id = unique_id.as_str(),
                "dispatching inbound call"
            );
            // Handlers run on their own task so the inbound driver stays
            // responsive.
            tokio::spawn(async move {
                let outcome = invoke(&handlers, &peer_id, request).await;
                endpoint.reply(&peer_id, &unique_id, outcome);
            });
        }));

        CentralSystem { endpoint, config: self.config }
    }
}

// ── CentralSystem ──────────────────────────────────────────────

/// An OCPP 1.6 central system.
///
/// Typed send methods accept the fully-built request payload and a typed
/// callback; completion callbacks for one charge point fire in submission
/// order. Construction goes through [`CentralSystemBuilder`].
pub struct CentralSystem {
    endpoint: Arc<ocppj::Server>,
    config: CentralSystemConfig,
}

impl CentralSystem {
    pub fn builder(config: CentralSystemConfig) -> CentralSystemBuilder {
        CentralSystemBuilder::new(config)
    }

    /// Start listening for charge-point connections.
    pub async fn start(&self) -> Result<(), OcppError> {
        self.endpoint
            .start(self.config.port, &self.config.path)
            .await
    }

    /// Cancel all outstanding calls and stop the transport.
    pub async fn stop(&self) {
        self.endpoint.stop().await;
    }

    /// Take the asynchronous errors channel receiver. Single consumer.
    pub fn errors(&self) -> Option<mpsc::Receiver<EndpointError>> {
        self.endpoint.errors()
    }

    /// Pre-flight checks plus delegation to the endpoint queue.
    fn send<F>(&self, charge_point_id: &str, request: Request, callback: F) -> Result<(), OcppError>
    where
        F: FnOnce(CallOutcome) + Send + 'static,
    {
        let action = request.action();
        let descriptor = self.endpoint.registry().feature(action).ok_or_else(|| {
            OcppError::new(
                ErrorCode::NotSupported,
                format!("feature {action} is unsupported on central system (missing profile), cannot send request"),
            )
        })?;
        if !descriptor.initiator.allows(Role::CentralSystem) {
            return Err(OcppError::new(
                ErrorCode::NotSupported,
                format!("unsupported action {action} on central system, cannot send request"),
            ));
        }
        self.endpoint
            .send_request(charge_point_id, request, Box::new(callback))
    }

    // ── Core profile ───────────────────────────────────────

    pub fn change_availability<F>(
        &self,
        charge_point_id: &str,
        request: ChangeAvailabilityRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<ChangeAvailabilityResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::ChangeAvailability(request), move |outcome| {
            callback(match outcome {
                Ok(Response::ChangeAvailability(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::CHANGE_AVAILABILITY, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn change_configuration<F>(
        &self,
        charge_point_id: &str,
        request: ChangeConfigurationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<ChangeConfigurationResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::ChangeConfiguration(request), move |outcome| {
            callback(match outcome {
                Ok(Response::ChangeConfiguration(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::CHANGE_CONFIGURATION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn clear_cache<F>(
        &self,
        charge_point_id: &str,
        request: ClearCacheRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<ClearCacheResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::ClearCache(request), move |outcome| {
            callback(match outcome {
                Ok(Response::ClearCache(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::CLEAR_CACHE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn data_transfer<F>(
        &self,
        charge_point_id: &str,
        request: DataTransferRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<DataTransferResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::DataTransfer(request), move |outcome| {
            callback(match outcome {
                Ok(Response::DataTransfer(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::DATA_TRANSFER, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn get_configuration<F>(
        &self,
        charge_point_id: &str,
        request: GetConfigurationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<GetConfigurationResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::GetConfiguration(request), move |outcome| {
            callback(match outcome {
                Ok(Response::GetConfiguration(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::GET_CONFIGURATION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn remote_start_transaction<F>(
        &self,
        charge_point_id: &str,
        request: RemoteStartTransactionRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<RemoteStartTransactionResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::RemoteStartTransaction(request), move |outcome| {
            callback(match outcome {
                Ok(Response::RemoteStartTransaction(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::REMOTE_START_TRANSACTION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn remote_stop_transaction<F>(
        &self,
        charge_point_id: &str,
        request: RemoteStopTransactionRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<RemoteStopTransactionResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::RemoteStopTransaction(request), move |outcome| {
            callback(match outcome {
                Ok(Response::RemoteStopTransaction(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::REMOTE_STOP_TRANSACTION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn reset<F>(
        &self,
        charge_point_id: &str,
        request: ResetRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<ResetResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::Reset(request), move |outcome| {
            callback(match outcome {
                Ok(Response::Reset(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::RESET, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn unlock_connector<F>(
        &self,
        charge_point_id: &str,
        request: UnlockConnectorRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<UnlockConnectorResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::UnlockConnector(request), move |outcome| {
            callback(match outcome {
                Ok(Response::UnlockConnector(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::UNLOCK_CONNECTOR, &other)),
                Err(error) => Err(error),
            })
        })
    }

    // ── LocalAuthListManagement profile ────────────────────

    pub fn get_local_list_version<F>(
        &self,
        charge_point_id: &str,
        request: GetLocalListVersionRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<GetLocalListVersionResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::GetLocalListVersion(request), move |outcome| {
            callback(match outcome {
                Ok(Response::GetLocalListVersion(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(local_auth::GET_LOCAL_LIST_VERSION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn send_local_list<F>(
        &self,
        charge_point_id: &str,
        request: SendLocalListRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<SendLocalListResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::SendLocalList(request), move |outcome| {
            callback(match outcome {
                Ok(Response::SendLocalList(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(local_auth::SEND_LOCAL_LIST, &other)),
                Err(error) => Err(error),
            })
        })
    }

    // ── FirmwareManagement profile ─────────────────────────

    pub fn get_diagnostics<F>(
        &self,
        charge_point_id: &str,
        request: GetDiagnosticsRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<GetDiagnosticsResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::GetDiagnostics(request), move |outcome| {
            callback(match outcome {
                Ok(Response::GetDiagnostics(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(firmware::GET_DIAGNOSTICS, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn update_firmware<F>(
        &self,
        charge_point_id: &str,
        request: UpdateFirmwareRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<UpdateFirmwareResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::UpdateFirmware(request), move |outcome| {
            callback(match outcome {
                Ok(Response::UpdateFirmware(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(firmware::UPDATE_FIRMWARE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    // ── Reservation profile ────────────────────────────────

    pub fn reserve_now<F>(
        &self,
        charge_point_id: &str,
        request: ReserveNowRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<ReserveNowResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::ReserveNow(request), move |outcome| {
            callback(match outcome {
                Ok(Response::ReserveNow(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(reservation::RESERVE_NOW, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn cancel_reservation<F>(
        &self,
        charge_point_id: &str,
        request: CancelReservationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<CancelReservationResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::CancelReservation(request), move |outcome| {
            callback(match outcome {
                Ok(Response::CancelReservation(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(reservation::CANCEL_RESERVATION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    // ── RemoteTrigger profile ──────────────────────────────

    pub fn trigger_message<F>(
        &self,
        charge_point_id: &str,
        request: TriggerMessageRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<TriggerMessageResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::TriggerMessage(request), move |outcome| {
            callback(match outcome {
                Ok(Response::TriggerMessage(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(remote_trigger::TRIGGER_MESSAGE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    // ── SmartCharging profile ──────────────────────────────

    pub fn set_charging_profile<F>(
        &self,
        charge_point_id: &str,
        request: SetChargingProfileRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<SetChargingProfileResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::SetChargingProfile(request), move |outcome| {
            callback(match outcome {
                Ok(Response::SetChargingProfile(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(smart_charging::SET_CHARGING_PROFILE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn clear_charging_profile<F>(
        &self,
        charge_point_id: &str,
        request: ClearChargingProfileRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<ClearChargingProfileResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::ClearChargingProfile(request), move |outcome| {
            callback(match outcome {
                Ok(Response::ClearChargingProfile(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(smart_charging::CLEAR_CHARGING_PROFILE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn get_composite_schedule<F>(
        &self,
        charge_point_id: &str,
        request: GetCompositeScheduleRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<GetCompositeScheduleResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::GetCompositeSchedule(request), move |outcome| {
            callback(match outcome {
                Ok(Response::GetCompositeSchedule(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(smart_charging::GET_COMPOSITE_SCHEDULE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    // ── Security extension profiles ────────────────────────

    pub fn certificate_signed<F>(
        &self,
        charge_point_id: &str,
        request: CertificateSignedRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<CertificateSignedResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::CertificateSigned(request), move |outcome| {
            callback(match outcome {
                Ok(Response::CertificateSigned(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(security::CERTIFICATE_SIGNED, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn signed_update_firmware<F>(
        &self,
        charge_point_id: &str,
        request: SignedUpdateFirmwareRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<SignedUpdateFirmwareResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::SignedUpdateFirmware(request), move |outcome| {
            callback(match outcome {
                Ok(Response::SignedUpdateFirmware(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(secure_firmware::SIGNED_UPDATE_FIRMWARE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn get_log<F>(
        &self,
        charge_point_id: &str,
        request: GetLogRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<GetLogResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::GetLog(request), move |outcome| {
            callback(match outcome {
                Ok(Response::GetLog(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(logging::GET_LOG, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn extended_trigger_message<F>(
        &self,
        charge_point_id: &str,
        request: ExtendedTriggerMessageRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<ExtendedTriggerMessageResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::ExtendedTriggerMessage(request), move |outcome| {
            callback(match outcome {
                Ok(Response::ExtendedTriggerMessage(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(extended_trigger::EXTENDED_TRIGGER_MESSAGE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn get_installed_certificate_ids<F>(
        &self,
        charge_point_id: &str,
        request: GetInstalledCertificateIdsRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<GetInstalledCertificateIdsResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::GetInstalledCertificateIds(request), move |outcome| {
            callback(match outcome {
                Ok(Response::GetInstalledCertificateIds(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(certificates::GET_INSTALLED_CERTIFICATE_IDS, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn install_certificate<F>(
        &self,
        charge_point_id: &str,
        request: InstallCertificateRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<InstallCertificateResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::InstallCertificate(request), move |outcome| {
            callback(match outcome {
                Ok(Response::InstallCertificate(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(certificates::INSTALL_CERTIFICATE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn delete_certificate<F>(
        &self,
        charge_point_id: &str,
        request: DeleteCertificateRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<DeleteCertificateResponse, OcppError>) + Send + 'static,
    {
        self.send(charge_point_id, Request::DeleteCertificate(request), move |outcome| {
            callback(match outcome {
                Ok(Response::DeleteCertificate(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(certificates::DELETE_CERTIFICATE, &other)),
                Err(error) => Err(error),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_ocpp::v1_6::types::{RegistrationStatus, ResetRequestStatus};

    use super::*;
    use crate::support::ocpp_frame::OcppFrame;
    use crate::transport::mock::MockServerTransport;

    const CP: &str = "CP001";

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within 1s");
    }

    struct TestCore {
        empty_boot: bool,
    }

    #[async_trait]
    impl CoreHandler for TestCore {
        async fn on_boot_notification(
            &self,
            _charge_point_id: &str,
            _request: BootNotificationRequest,
        ) -> HandlerResult<BootNotificationResponse> {
            if self.empty_boot {
                return Ok(None);
            }
            Ok(Some(BootNotificationResponse {
                current_time: Utc::now(),
                interval: 300,
                status: RegistrationStatus::Accepted,
            }))
        }

        async fn on_heartbeat(
            &self,
            _charge_point_id: &str,
            _request: HeartbeatRequest,
        ) -> HandlerResult<HeartbeatResponse> {
            Ok(Some(HeartbeatResponse {
                current_time: Utc::now(),
            }))
        }
    }

    async fn started(builder: CentralSystemBuilder) -> CentralSystem {
        crate::support::init_test_tracing();
        let central_system = builder.build();
        central_system.start().await.unwrap();
        central_system
    }

    fn builder_with_core(transport: Arc<MockServerTransport>, empty_boot: bool) -> CentralSystemBuilder {
        CentralSystem::builder(CentralSystemConfig::default())
            .with_transport(transport)
            .with_call_timeout(None)
            .with_core_handler(Arc::new(TestCore { empty_boot }))
    }

    fn soft_reset() -> ResetRequest {
        ResetRequest {
            kind: ResetRequestStatus::Soft,
        }
    }

    #[tokio::test]
    async fn inbound_boot_notification_gets_call_result() {
        let transport = MockServerTransport::new();
        let _cs = started(builder_with_core(transport.clone(), false)).await;

        transport.inject_message(
            CP,
            r#"[2,"b1","BootNotification",{"chargePointVendor":"V","chargePointModel":"M"}]"#,
        );
        wait_until(|| !transport.frames_to(CP).is_empty()).await;

        let frames = transport.frames_to(CP);
        match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::CallResult { unique_id, payload } => {
                assert_eq!(unique_id, "b1");
                assert_eq!(payload["status"], "Accepted");
            }
            other => panic!("expected CallResult, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_confirmation_becomes_generic_error_and_report() {
        let transport = MockServerTransport::new();
        let cs = started(builder_with_core(transport.clone(), true)).await;
        let mut errors = cs.errors().unwrap();

        transport.inject_message(
            CP,
            r#"[2,"b2","BootNotification",{"chargePointVendor":"V","chargePointModel":"M"}]"#,
        );
        wait_until(|| !transport.frames_to(CP).is_empty()).await;

        let frames = transport.frames_to(CP);
        match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                assert_eq!(unique_id, "b2");
                assert_eq!(error_code, "GenericError");
                assert!(error_description.contains("empty confirmation"));
            }
            other => panic!("expected CallError, got {:?}", other),
        }

        let reported = tokio::time::timeout(Duration::from_secs(1), errors.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(reported, EndpointError::EmptyConfirmation { .. }));
        assert!(reported.to_string().contains("empty confirmation"));
    }

    #[tokio::test]
    async fn unknown_action_yields_not_implemented() {
        let transport = MockServerTransport::new();
        let _cs = started(builder_with_core(transport.clone(), false)).await;

        transport.inject_message(CP, r#"[2,"abc123","UnknownAction",{}]"#);

        let frames = transport.frames_to(CP);
        assert_eq!(frames.len(), 1);
        match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                assert_eq!(unique_id, "abc123");
                assert_eq!(error_code, "NotImplemented");
                assert_eq!(
                    error_description,
                    "no handler for action UnknownAction implemented"
                );
            }
            other => panic!("expected CallError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn schema_violation_is_rejected_before_the_handler() {
        let transport = MockServerTransport::new();
        let _cs = started(builder_with_core(transport.clone(), false)).await;

        // chargePointVendor has the wrong type.
        transport.inject_message(
            CP,
            r#"[2,"b3","BootNotification",{"chargePointVendor":5,"chargePointModel":"M"}]"#,
        );

        let frames = transport.frames_to(CP);
        assert_eq!(frames.len(), 1);
        match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::CallError { error_code, .. } => {
                assert_eq!(error_code, "TypeConstraintViolation");
            }
            other => panic!("expected CallError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn profile_without_handler_yields_not_supported() {
        let transport = MockServerTransport::new();
        // Firmware profile enabled, but no firmware handler registered.
        let _cs = started(builder_with_core(transport.clone(), false)).await;

        transport.inject_message(
            CP,
            r#"[2,"d1","DiagnosticsStatusNotification",{"status":"Idle"}]"#,
        );
        wait_until(|| !transport.frames_to(CP).is_empty()).await;

        let frames = transport.frames_to(CP);
        match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::CallError {
                error_code,
                error_description,
                ..
            } => {
                assert_eq!(error_code, "NotSupported");
                assert!(error_description.contains("DiagnosticsStatusNotification"));
            }
            other => panic!("expected CallError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn outbound_calls_are_serialized_per_peer() {
        let transport = MockServerTransport::new();
        let cs = started(builder_with_core(transport.clone(), false)).await;

        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 1..=3u32 {
            let order = order.clone();
            cs.reset(CP, soft_reset(), move |outcome| {
                outcome.unwrap();
                order.lock().unwrap().push(i);
            })
            .unwrap();
        }

        // Exactly one frame on the wire until its response arrives.
        assert_eq!(transport.frames_to(CP).len(), 1);

        for completed in 1..=3u32 {
            let frames = transport.frames_to(CP);
            let unique_id = match OcppFrame::parse(frames.last().unwrap()).unwrap() {
                OcppFrame::Call {
                    unique_id, action, ..
                } => {
                    assert_eq!(action, "Reset");
                    unique_id
                }
                other => panic!("expected Call, got {:?}", other),
            };
            transport.inject_message(CP, &format!(r#"[3,"{unique_id}",{{"status":"Accepted"}}]"#));
            let expected: Vec<u32> = (1..=completed).collect();
            assert_eq!(*order.lock().unwrap(), expected);
        }
        assert_eq!(transport.frames_to(CP).len(), 3);
    }

    #[tokio::test]
    async fn disconnect_cancels_queued_calls_in_order() {
        let transport = MockServerTransport::new();
        let cs = started(builder_with_core(transport.clone(), false)).await;

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        for i in 1..=2u32 {
            let outcomes = outcomes.clone();
            cs.reset(CP, soft_reset(), move |outcome| {
                let error = outcome.unwrap_err();
                outcomes.lock().unwrap().push((i, error.code, error.description));
            })
            .unwrap();
        }
        assert_eq!(transport.frames_to(CP).len(), 1);

        transport.inject_disconnect(CP);

        let recorded = outcomes.lock().unwrap().clone();
        assert_eq!(recorded.len(), 2);
        for (index, (i, code, description)) in recorded.iter().enumerate() {
            assert_eq!(*i as usize, index + 1);
            assert_eq!(*code, ErrorCode::GenericError);
            assert_eq!(
                description,
                "client disconnected, no response received from client"
            );
        }
        // The waiting call never hit the wire, and a second disconnect is a
        // no-op.
        assert_eq!(transport.frames_to(CP).len(), 1);
        transport.inject_disconnect(CP);
        assert_eq!(outcomes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn orphan_call_result_is_reported_not_answered() {
        let transport = MockServerTransport::new();
        let cs = started(builder_with_core(transport.clone(), false)).await;
        let mut errors = cs.errors().unwrap();

        transport.inject_message(CP, r#"[3,"nope",{"status":"Accepted"}]"#);

        let reported = tokio::time::timeout(Duration::from_secs(1), errors.recv())
            .await
            .unwrap()
            .unwrap();
        let message = reported.to_string();
        assert!(message.contains("no handler available for call of type CallResult"));
        assert!(message.contains("for request nope"));
        assert!(transport.frames_to(CP).is_empty());
    }

    #[tokio::test]
    async fn mismatched_response_id_is_orphan_and_call_stays_pending() {
        let transport = MockServerTransport::new();
        let cs = started(builder_with_core(transport.clone(), false)).await;
        let mut errors = cs.errors().unwrap();

        let completed = Arc::new(Mutex::new(false));
        let completed_flag = completed.clone();
        cs.reset(CP, soft_reset(), move |outcome| {
            outcome.unwrap();
            *completed_flag.lock().unwrap() = true;
        })
        .unwrap();

        transport.inject_message(CP, r#"[3,"wrong-id",{"status":"Accepted"}]"#);
        assert!(!*completed.lock().unwrap());
        let reported = tokio::time::timeout(Duration::from_secs(1), errors.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(reported, EndpointError::OrphanResponse { .. }));

        // The genuine response still completes the call.
        let frames = transport.frames_to(CP);
        let unique_id = OcppFrame::parse(&frames[0]).unwrap().unique_id().to_string();
        transport.inject_message(CP, &format!(r#"[3,"{unique_id}",{{"status":"Accepted"}}]"#));
        assert!(*completed.lock().unwrap());
    }

    #[tokio::test]
    async fn call_error_response_reaches_callback() {
        let transport = MockServerTransport::new();
        let cs = started(builder_with_core(transport.clone(), false)).await;

        let seen = Arc::new(Mutex::new(None));
        let seen_error = seen.clone();
        cs.reset(CP, soft_reset(), move |outcome| {
            *seen_error.lock().unwrap() = Some(outcome.unwrap_err());
        })
        .unwrap();

        let frames = transport.frames_to(CP);
        let unique_id = OcppFrame::parse(&frames[0]).unwrap().unique_id().to_string();
        transport.inject_message(
            CP,
            &format!(r#"[4,"{unique_id}","InternalError","charger is busy",{{}}]"#),
        );

        let error = seen.lock().unwrap().clone().unwrap();
        assert_eq!(error.code, ErrorCode::InternalError);
        assert_eq!(error.description, "charger is busy");
    }

    #[tokio::test]
    async fn charge_point_actions_cannot_be_sent_from_central_system() {
        let transport = MockServerTransport::new();
        let cs = started(builder_with_core(transport.clone(), false)).await;

        let error = cs
            .send(CP, Request::Heartbeat(HeartbeatRequest {}), |_| {
                panic!("callback must not fire for rejected sends")
            })
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::NotSupported);
        assert!(error.description.contains("cannot send request"));
        assert!(transport.frames_to(CP).is_empty());
    }

    #[tokio::test]
    async fn disabled_profile_fails_preflight() {
        let transport = MockServerTransport::new();
        let cs = started(
            builder_with_core(transport.clone(), false).with_profiles(&[Profile::Core]),
        )
        .await;

        let error = cs
            .get_local_list_version(
                CP,
                GetLocalListVersionRequest {},
                |_| panic!("callback must not fire for rejected sends"),
            )
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::NotSupported);
        assert!(error.description.contains("missing profile"));
        assert!(transport.frames_to(CP).is_empty());
    }

    #[tokio::test]
    async fn pending_call_times_out_and_queue_advances() {
        let transport = MockServerTransport::new();
        let cs = started(
            builder_with_core(transport.clone(), false)
                .with_call_timeout(Some(Duration::from_millis(20))),
        )
        .await;

        let timed_out = Arc::new(Mutex::new(None));
        let sink = timed_out.clone();
        cs.reset(CP, soft_reset(), move |outcome| {
            *sink.lock().unwrap() = Some(outcome.unwrap_err());
        })
        .unwrap();
        cs.reset(CP, soft_reset(), |_| {}).unwrap();
        assert_eq!(transport.frames_to(CP).len(), 1);

        wait_until(|| timed_out.lock().unwrap().is_some()).await;
        let error = timed_out.lock().unwrap().clone().unwrap();
        assert_eq!(error.code, ErrorCode::GenericError);
        assert!(error.description.contains("timed out"));

        // The second call was promoted onto the wire.
        wait_until(|| transport.frames_to(CP).len() == 2).await;
    }

    #[tokio::test]
    async fn stop_cancels_outstanding_calls_and_rejects_new_ones() {
        let transport = MockServerTransport::new();
        let cs = started(builder_with_core(transport.clone(), false)).await;

        let cancelled = Arc::new(Mutex::new(None));
        let sink = cancelled.clone();
        cs.reset(CP, soft_reset(), move |outcome| {
            *sink.lock().unwrap() = Some(outcome.unwrap_err());
        })
        .unwrap();

        cs.stop().await;

        let error = cancelled.lock().unwrap().clone().unwrap();
        assert!(error.description.contains("endpoint stopped"));

        let error = cs.reset(CP, soft_reset(), |_| {}).unwrap_err();
        assert!(error.description.contains("endpoint is stopped"));
    }

    #[tokio::test]
    async fn send_failure_reaches_callback_as_generic_error() {
        let transport = MockServerTransport::new();
        let cs = started(builder_with_core(transport.clone(), false)).await;

        transport.fail_sends(true);
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        cs.reset(CP, soft_reset(), move |outcome| {
            *sink.lock().unwrap() = Some(outcome.unwrap_err());
        })
        .unwrap();

        let error = seen.lock().unwrap().clone().unwrap();
        assert_eq!(error.code, ErrorCode::GenericError);
        assert!(error.description.contains("send failed"));
    }

    #[tokio::test]
    async fn client_validator_is_installed_on_the_transport() {
        let transport = MockServerTransport::new();
        let _cs = started(
            builder_with_core(transport.clone(), false)
                .with_client_validator(|charge_point_id| charge_point_id == "good"),
        )
        .await;

        assert!(transport.validate("good"));
        assert!(!transport.validate("bad"));
    }

    #[tokio::test]
    async fn malformed_frame_with_salvageable_id_gets_protocol_error() {
        let transport = MockServerTransport::new();
        let _cs = started(builder_with_core(transport.clone(), false)).await;

        transport.inject_message(CP, r#"[2,"x1"]"#);

        let frames = transport.frames_to(CP);
        assert_eq!(frames.len(), 1);
        match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::CallError {
                unique_id,
                error_code,
                ..
            } => {
                assert_eq!(unique_id, "x1");
                assert_eq!(error_code, "ProtocolError");
            }
            other => panic!("expected CallError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connect_and_disconnect_hooks_fire() {
        let transport = MockServerTransport::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let connected = events.clone();
        let disconnected = events.clone();
        let _cs = started(
            builder_with_core(transport.clone(), false)
                .on_connect(move |id| connected.lock().unwrap().push(format!("+{id}")))
                .on_disconnect(move |id| disconnected.lock().unwrap().push(format!("-{id}"))),
        )
        .await;

        transport.inject_connect(CP);
        transport.inject_disconnect(CP);
        assert_eq!(*events.lock().unwrap(), vec!["+CP001", "-CP001"]);
    }
}
