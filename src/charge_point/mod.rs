//! Charge-point shell: typed facade over the OCPP-J client endpoint.
//!
//! Mirrors [`crate::central_system`] for the other role: one method per
//! CP→CS action, per-profile handler traits for inbound central-system
//! calls, builder-style construction.

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

use crate::config::ChargePointConfig;
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
use crate::transport::ws::WsTransportClient;
use crate::transport::{DisconnectHandler, TransportClient};

fn not_supported(action: &str) -> OcppError {
    OcppError::new(
        ErrorCode::NotSupported,
        format!("unsupported action {action} on charge point"),
    )
}

// ── Inbound handler traits ─────────────────────────────────────

/// Core profile handler (central-system-initiated features).
#[async_trait]
pub trait CoreHandler: Send + Sync {
    async fn on_change_availability(
        &self,
        request: ChangeAvailabilityRequest,
    ) -> HandlerResult<ChangeAvailabilityResponse> {
        let _ = request;
        Err(not_supported(core::CHANGE_AVAILABILITY))
    }

    async fn on_change_configuration(
        &self,
        request: ChangeConfigurationRequest,
    ) -> HandlerResult<ChangeConfigurationResponse> {
        let _ = request;
        Err(not_supported(core::CHANGE_CONFIGURATION))
    }

    async fn on_clear_cache(&self, request: ClearCacheRequest) -> HandlerResult<ClearCacheResponse> {
        let _ = request;
        Err(not_supported(core::CLEAR_CACHE))
    }

    async fn on_data_transfer(
        &self,
        request: DataTransferRequest,
    ) -> HandlerResult<DataTransferResponse> {
        let _ = request;
        Err(not_supported(core::DATA_TRANSFER))
    }

    async fn on_get_configuration(
        &self,
        request: GetConfigurationRequest,
    ) -> HandlerResult<GetConfigurationResponse> {
        let _ = request;
        Err(not_supported(core::GET_CONFIGURATION))
    }

    async fn on_remote_start_transaction(
        &self,
        request: RemoteStartTransactionRequest,
    ) -> HandlerResult<RemoteStartTransactionResponse> {
        let _ = request;
        Err(not_supported(core::REMOTE_START_TRANSACTION))
    }

    async fn on_remote_stop_transaction(
        &self,
        request: RemoteStopTransactionRequest,
    ) -> HandlerResult<RemoteStopTransactionResponse> {
        let _ = request;
        Err(not_supported(core::REMOTE_STOP_TRANSACTION))
    }

    async fn on_reset(&self, request: ResetRequest) -> HandlerResult<ResetResponse> {
        let _ = request;
        Err(not_supported(core::RESET))
    }

    async fn on_unlock_connector(
        &self,
        request: UnlockConnectorRequest,
    ) -> HandlerResult<UnlockConnectorResponse> {
        let _ = request;
        Err(not_supported(core::UNLOCK_CONNECTOR))
    }
}

/// LocalAuthListManagement profile handler.
#[async_trait]
pub trait LocalAuthHandler: Send + Sync {
    async fn on_get_local_list_version(
        &self,
        request: GetLocalListVersionRequest,
    ) -> HandlerResult<GetLocalListVersionResponse> {
        let _ = request;
        Err(not_supported(local_auth::GET_LOCAL_LIST_VERSION))
    }

    async fn on_send_local_list(
        &self,
        request: SendLocalListRequest,
    ) -> HandlerResult<SendLocalListResponse> {
        let _ = request;
        Err(not_supported(local_auth::SEND_LOCAL_LIST))
    }
}

/// FirmwareManagement profile handler.
#[async_trait]
pub trait FirmwareHandler: Send + Sync {
    async fn on_get_diagnostics(
        &self,
        request: GetDiagnosticsRequest,
    ) -> HandlerResult<GetDiagnosticsResponse> {
        let _ = request;
        Err(not_supported(firmware::GET_DIAGNOSTICS))
    }

    async fn on_update_firmware(
        &self,
        request: UpdateFirmwareRequest,
    ) -> HandlerResult<UpdateFirmwareResponse> {
        let _ = request;
        Err(not_supported(firmware::UPDATE_FIRMWARE))
    }
}

/// Reservation profile handler.
#[async_trait]
pub trait ReservationHandler: Send + Sync {
    async fn on_reserve_now(&self, request: ReserveNowRequest) -> HandlerResult<ReserveNowResponse> {
        let _ = request;
        Err(not_supported(reservation::RESERVE_NOW))
    }

    async fn on_cancel_reservation(
        &self,
        request: CancelReservationRequest,
    ) -> HandlerResult<CancelReservationResponse> {
        let _ = request;
        Err(not_supported(reservation::CANCEL_RESERVATION))
    }
}

/// RemoteTrigger profile handler.
#[async_trait]
pub trait RemoteTriggerHandler: Send + Sync {
    async fn on_trigger_message(
        &self,
        request: TriggerMessageRequest,
    ) -> HandlerResult<TriggerMessageResponse> {
        let _ = request;
        Err(not_supported(remote_trigger::TRIGGER_MESSAGE))
    }
}

/// SmartCharging profile handler.
#[async_trait]
pub trait SmartChargingHandler: Send + Sync {
    async fn on_set_charging_profile(
        &self,
        request: SetChargingProfileRequest,
    ) -> HandlerResult<SetChargingProfileResponse> {
        let _ = request;
        Err(not_supported(smart_charging::SET_CHARGING_PROFILE))
    }

    async fn on_clear_charging_profile(
        &self,
        request: ClearChargingProfileRequest,
    ) -> HandlerResult<ClearChargingProfileResponse> {
        let _ = request;
        Err(not_supported(smart_charging::CLEAR_CHARGING_PROFILE))
    }

    async fn on_get_composite_schedule(
        &self,
        request: GetCompositeScheduleRequest,
    ) -> HandlerResult<GetCompositeScheduleResponse> {
        let _ = request;
        Err(not_supported(smart_charging::GET_COMPOSITE_SCHEDULE))
    }
}

/// Security profile handler.
#[async_trait]
pub trait SecurityHandler: Send + Sync {
    async fn on_certificate_signed(
        &self,
        request: CertificateSignedRequest,
    ) -> HandlerResult<CertificateSignedResponse> {
        let _ = request;
        Err(not_supported(security::CERTIFICATE_SIGNED))
    }
}

/// SecureFirmwareUpdate profile handler.
#[async_trait]
pub trait SecureFirmwareHandler: Send + Sync {
    async fn on_signed_update_firmware(
        &self,
        request: SignedUpdateFirmwareRequest,
    ) -> HandlerResult<SignedUpdateFirmwareResponse> {
        let _ = request;
        Err(not_supported(secure_firmware::SIGNED_UPDATE_FIRMWARE))
    }
}

/// Logging profile handler.
#[async_trait]
pub trait LogHandler: Send + Sync {
    async fn on_get_log(&self, request: GetLogRequest) -> HandlerResult<GetLogResponse> {
        let _ = request;
        Err(not_supported(logging::GET_LOG))
    }
}

/// Certificates profile handler.
#[async_trait]
pub trait CertificatesHandler: Send + Sync {
    async fn on_get_installed_certificate_ids(
        &self,
        request: GetInstalledCertificateIdsRequest,
    ) -> HandlerResult<GetInstalledCertificateIdsResponse> {
        let _ = request;
        Err(not_supported(certificates::GET_INSTALLED_CERTIFICATE_IDS))
    }

    async fn on_install_certificate(
        &self,
        request: InstallCertificateRequest,
    ) -> HandlerResult<InstallCertificateResponse> {
        let _ = request;
        Err(not_supported(certificates::INSTALL_CERTIFICATE))
    }

    async fn on_delete_certificate(
        &self,
        request: DeleteCertificateRequest,
    ) -> HandlerResult<DeleteCertificateResponse> {
        let _ = request;
        Err(not_supported(certificates::DELETE_CERTIFICATE))
    }
}

/// ExtendedTriggerMessage profile handler.
#[async_trait]
pub trait ExtendedTriggerHandler: Send + Sync {
    async fn on_extended_trigger_message(
        &self,
        request: ExtendedTriggerMessageRequest,
    ) -> HandlerResult<ExtendedTriggerMessageResponse> {
        let _ = request;
        Err(not_supported(extended_trigger::EXTENDED_TRIGGER_MESSAGE))
    }
}

#[derive(Default)]
struct InboundHandlers {
    core: Option<Arc<dyn CoreHandler>>,
    local_auth: Option<Arc<dyn LocalAuthHandler>>,
    firmware: Option<Arc<dyn FirmwareHandler>>,
    reservation: Option<Arc<dyn ReservationHandler>>,
    remote_trigger: Option<Arc<dyn RemoteTriggerHandler>>,
    smart_charging: Option<Arc<dyn SmartChargingHandler>>,
    security: Option<Arc<dyn SecurityHandler>>,
    secure_firmware: Option<Arc<dyn SecureFirmwareHandler>>,
    log: Option<Arc<dyn LogHandler>>,
    certificates: Option<Arc<dyn CertificatesHandler>>,
    extended_trigger: Option<Arc<dyn ExtendedTriggerHandler>>,
}

/// Route an inbound request to the matching profile handler.
async fn invoke(handlers: &InboundHandlers, request: Request) -> Result<Option<Response>, OcppError> {
    match request {
        Request::ChangeAvailability(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::CHANGE_AVAILABILITY));
            };
            handler
                .on_change_availability(request)
                .await
                .map(|r| r.map(Response::ChangeAvailability))
        }
        Request::ChangeConfiguration(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::CHANGE_CONFIGURATION));
            };
            handler
                .on_change_configuration(request)
                .await
                .map(|r| r.map(Response::ChangeConfiguration))
        }
        Request::ClearCache(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::CLEAR_CACHE));
            };
            handler
                .on_clear_cache(request)
                .await
                .map(|r| r.map(Response::ClearCache))
        }
        Request::DataTransfer(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::DATA_TRANSFER));
            };
            handler
                .on_data_transfer(request)
                .await
                .map(|r| r.map(Response::DataTransfer))
        }
        Request::GetConfiguration(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::GET_CONFIGURATION));
            };
            handler
                .on_get_configuration(request)
                .await
                .map(|r| r.map(Response::GetConfiguration))
        }
        Request::RemoteStartTransaction(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::REMOTE_START_TRANSACTION));
            };
            handler
                .on_remote_start_transaction(request)
                .await
                .map(|r| r.map(Response::RemoteStartTransaction))
        }
        Request::RemoteStopTransaction(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::REMOTE_STOP_TRANSACTION));
            };
            handler
                .on_remote_stop_transaction(request)
                .await
                .map(|r| r.map(Response::RemoteStopTransaction))
        }
        Request::Reset(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::RESET));
            };
            handler.on_reset(request).await.map(|r| r.map(Response::Reset))
        }
        Request::UnlockConnector(request) => {
            let Some(handler) = handlers.core.clone() else {
                return Err(not_supported(core::UNLOCK_CONNECTOR));
            };
            handler
                .on_unlock_connector(request)
                .await
                .map(|r| r.map(Response::UnlockConnector))
        }
        Request::GetLocalListVersion(request) => {
            let Some(handler) = handlers.local_auth.clone() else {
                return Err(not_supported(local_auth::GET_LOCAL_LIST_VERSION));
            };
            handler
                .on_get_local_list_version(request)
                .await
                .map(|r| r.map(Response::GetLocalListVersion))
        }
        Request::SendLocalList(request) => {
            let Some(handler) = handlers.local_auth.clone() else {
                return Err(not_supported(local_auth::SEND_LOCAL_LIST));
            };
            handler
                .on_send_local_list(request)
                .await
                .map(|r| r.map(Response::SendLocalList))
        }
        Request::GetDiagnostics(request) => {
            let Some(handler) = handlers.firmware.clone() else {
                return Err(not_supported(firmware::GET_DIAGNOSTICS));
            };
            handler
                .on_get_diagnostics(request)
                .await
                .map(|r| r.map(Response::GetDiagnostics))
        }
        Request::UpdateFirmware(request) => {
            let Some(handler) = handlers.firmware.clone() else {
                return Err(not_supported(firmware::UPDATE_FIRMWARE));
            };
            handler
                .on_update_firmware(request)
                .await
                .map(|r| r.map(Response::UpdateFirmware))
        }
        Request::ReserveNow(request) => {
            let Some(handler) = handlers.reservation.clone() else {
                return Err(not_supported(reservation::RESERVE_NOW));
            };
            handler
                .on_reserve_now(request)
                .await
                .map(|r| r.map(Response::ReserveNow))
        }
        Request::CancelReservation(request) => {
            let Some(handler) = handlers.reservation.clone() else {
                return Err(not_supported(reservation::CANCEL_RESERVATION));
            };
            handler
                .on_cancel_reservation(request)
                .await
                .map(|r| r.map(Response::CancelReservation))
        }
        Request::TriggerMessage(request) => {
            let Some(handler) = handlers.remote_trigger.clone() else {
                return Err(not_supported(remote_trigger::TRIGGER_MESSAGE));
            };
            handler
                .on_trigger_message(request)
                .await
                .map(|r| r.map(Response::TriggerMessage))
        }
        Request::SetChargingProfile(request) => {
            let Some(handler) = handlers.smart_charging.clone() else {
                return Err(not_supported(smart_charging::SET_CHARGING_PROFILE));
            };
            handler
                .on_set_charging_profile(request)
                .await
                .map(|r| r.map(Response::SetChargingProfile))
        }
        Request::ClearChargingProfile(request) => {
            let Some(handler) = handlers.smart_charging.clone() else {
                return Err(not_supported(smart_charging::CLEAR_CHARGING_PROFILE));
            };
            handler
                .on_clear_charging_profile(request)
                .await
                .map(|r| r.map(Response::ClearChargingProfile))
        }
        Request::GetCompositeSchedule(request) => {
            let Some(handler) = handlers.smart_charging.clone() else {
                return Err(not_supported(smart_charging::GET_COMPOSITE_SCHEDULE));
            };
            handler
                .on_get_composite_schedule(request)
                .await
                .map(|r| r.map(Response::GetCompositeSchedule))
        }
        Request::CertificateSigned(request) => {
            let Some(handler) = handlers.security.clone() else {
                return Err(not_supported(security::CERTIFICATE_SIGNED));
            };
            handler
                .on_certificate_signed(request)
                .await
                .map(|r| r.map(Response::CertificateSigned))
        }
        Request::SignedUpdateFirmware(request) => {
            let Some(handler) = handlers.secure_firmware.clone() else {
                return Err(not_supported(secure_firmware::SIGNED_UPDATE_FIRMWARE));
            };
            handler
                .on_signed_update_firmware(request)
                .await
                .map(|r| r.map(Response::SignedUpdateFirmware))
        }
        Request::GetLog(request) => {
            let Some(handler) = handlers.log.clone() else {
                return Err(not_supported(logging::GET_LOG));
            };
            handler.on_get_log(request).await.map(|r| r.map(Response::GetLog))
        }
        Request::GetInstalledCertificateIds(request) => {
            let Some(handler) = handlers.certificates.clone() else {
                return Err(not_supported(certificates::GET_INSTALLED_CERTIFICATE_IDS));
            };
            handler
                .on_get_installed_certificate_ids(request)
                .await
                .map(|r| r.map(Response::GetInstalledCertificateIds))
        }
        Request::InstallCertificate(request) => {
            let Some(handler) = handlers.certificates.clone() else {
                return Err(not_supported(certificates::INSTALL_CERTIFICATE));
            };
            handler
                .on_install_certificate(request)
                .await
                .map(|r| r.map(Response::InstallCertificate))
        }
        Request::DeleteCertificate(request) => {
            let Some(handler) = handlers.certificates.clone() else {
                return Err(not_supported(certificates::DELETE_CERTIFICATE));
            };
            handler
                .on_delete_certificate(request)
                .await
                .map(|r| r.map(Response::DeleteCertificate))
        }
        Request::ExtendedTriggerMessage(request) => {
            let Some(handler) = handlers.extended_trigger.clone() else {
                return Err(not_supported(extended_trigger::EXTENDED_TRIGGER_MESSAGE));
            };
            handler
                .on_extended_trigger_message(request)
                .await
                .map(|r| r.map(Response::ExtendedTriggerMessage))
        }
        // CP→CS actions arriving from the central system.
        other => Err(not_supported(other.action())),
    }
}

// ── Builder ────────────────────────────────────────────────────

/// Builder for a [`ChargePoint`]. Profiles, handlers and hooks cannot
/// change once `build` has run.
pub struct ChargePointBuilder {
    config: ChargePointConfig,
    profiles: Vec<Profile>,
    call_timeout: Option<Duration>,
    transport: Option<Arc<dyn TransportClient>>,
    handlers: InboundHandlers,
    on_disconnect: Option<DisconnectHandler>,
}

impl ChargePointBuilder {
    pub fn new(config: ChargePointConfig) -> Self {
        let call_timeout = config.call_timeout();
        Self {
            config,
            profiles: Profile::ALL.to_vec(),
            call_timeout,
            transport: None,
            handlers: InboundHandlers::default(),
            on_disconnect: None,
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

    /// Use a custom transport instead of the WebSocket client.
    pub fn with_transport(mut self, transport: Arc<dyn TransportClient>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_core_handler(mut self, handler: Arc<dyn CoreHandler>) -> Self {
        self.handlers.core = Some(handler);
        self
    }

    pub fn with_local_auth_handler(mut self, handler: Arc<dyn LocalAuthHandler>) -> Self {
        self.handlers.local_auth = Some(handler);
        self
    }

    pub fn with_firmware_handler(mut self, handler: Arc<dyn FirmwareHandler>) -> Self {
        self.handlers.firmware = Some(handler);
        self
    }

    pub fn with_reservation_handler(mut self, handler: Arc<dyn ReservationHandler>) -> Self {
        self.handlers.reservation = Some(handler);
        self
    }

    pub fn with_remote_trigger_handler(mut self, handler: Arc<dyn RemoteTriggerHandler>) -> Self {
        self.handlers.remote_trigger = Some(handler);
        self
    }

    pub fn with_smart_charging_handler(mut self, handler: Arc<dyn SmartChargingHandler>) -> Self {
        self.handlers.smart_charging = Some(handler);
        self
    }

    pub fn with_security_handler(mut self, handler: Arc<dyn SecurityHandler>) -> Self {
        self.handlers.security = Some(handler);
        self
    }

    pub fn with_secure_firmware_handler(mut self, handler: Arc<dyn SecureFirmwareHandler>) -> Self {
        self.handlers.secure_firmware = Some(handler);
        self
    }

    pub fn with_log_handler(mut self, handler: Arc<dyn LogHandler>) -> Self {
        self.handlers.log = Some(handler);
        self
    }

    pub fn with_certificates_handler(mut self, handler: Arc<dyn CertificatesHandler>) -> Self {
        self.handlers.certificates = Some(handler);
        self
    }

    pub fn with_extended_trigger_handler(mut self, handler: Arc<dyn ExtendedTriggerHandler>) -> Self {
        self.handlers.extended_trigger = Some(handler);
        self
    }

    /// Hook invoked after the connection drops and outstanding calls have
    /// been cancelled.
    pub fn on_disconnect(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> ChargePoint {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WsTransportClient::new()));
        let registry = Arc::new(FeatureRegistry::with_profiles(&self.profiles));
        let endpoint = Arc::new(ocppj::Client::new(
            transport,
            registry,
            self.call_timeout,
        ));

        if let Some(hook) = self.on_disconnect {
            endpoint.set_disconnect_handler(hook);
        }

        let handlers = Arc::new(self.handlers);
        let dispatch_endpoint = endpoint.clone();
        let dispatch_handlers = handlers.clone();
        endpoint.set_request_handler(Arc::new(move |unique_id, request| {
            let endpoint = dispatch_endpoint.clone();
            let handlers = dispatch_handlers.clone();
            debug!(
                action = request.action(),
                message_id = unique_id.as_str(),
                "dispatching inbound call"
            );
            // Handlers run on their own task so the inbound driver stays
            // responsive.
            tokio::spawn(async move {
                let outcome = invoke(&handlers, request).await;
                endpoint.reply(&unique_id, outcome);
            });
        }));

        ChargePoint {
            endpoint,
            config: self.config,
        }
    }
}

// ── ChargePoint ────────────────────────────────────────────────

/// An OCPP 1.6 charge point.
///
/// Construction goes through [`ChargePointBuilder`]; completion callbacks
/// fire in submission order.
pub struct ChargePoint {
    endpoint: Arc<ocppj::Client>,
    config: ChargePointConfig,
}

impl ChargePoint {
    pub fn builder(config: ChargePointConfig) -> ChargePointBuilder {
        ChargePointBuilder::new(config)
    }

    /// Connect to the configured central system.
    pub async fn start(&self) -> Result<(), OcppError> {
        self.endpoint.start(&self.config.connection_url()).await
    }

    /// Cancel all outstanding calls and close the connection.
    pub async fn stop(&self) {
        self.endpoint.stop().await;
    }

    /// Take the asynchronous errors channel receiver. Single consumer.
    pub fn errors(&self) -> Option<mpsc::Receiver<EndpointError>> {
        self.endpoint.errors()
    }

    /// Pre-flight checks plus delegation to the endpoint queue.
    fn send<F>(&self, request: Request, callback: F) -> Result<(), OcppError>
    where
        F: FnOnce(CallOutcome) + Send + 'static,
    {
        let action = request.action();
        let descriptor = self.endpoint.registry().feature(action).ok_or_else(|| {
            OcppError::new(
                ErrorCode::NotSupported,
                format!("feature {action} is unsupported on charge point (missing profile), cannot send request"),
            )
        })?;
        if !descriptor.initiator.allows(Role::ChargePoint) {
            return Err(OcppError::new(
                ErrorCode::NotSupported,
                format!("unsupported action {action} on charge point, cannot send request"),
            ));
        }
        self.endpoint.send_request(request, Box::new(callback))
    }

    // ── Core profile ───────────────────────────────────────

    pub fn authorize<F>(&self, request: AuthorizeRequest, callback: F) -> Result<(), OcppError>
    where
        F: FnOnce(Result<AuthorizeResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::Authorize(request), move |outcome| {
            callback(match outcome {
                Ok(Response::Authorize(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::AUTHORIZE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn boot_notification<F>(
        &self,
        request: BootNotificationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<BootNotificationResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::BootNotification(request), move |outcome| {
            callback(match outcome {
                Ok(Response::BootNotification(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::BOOT_NOTIFICATION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn data_transfer<F>(
        &self,
        request: DataTransferRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<DataTransferResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::DataTransfer(request), move |outcome| {
            callback(match outcome {
                Ok(Response::DataTransfer(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::DATA_TRANSFER, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn heartbeat<F>(&self, request: HeartbeatRequest, callback: F) -> Result<(), OcppError>
    where
        F: FnOnce(Result<HeartbeatResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::Heartbeat(request), move |outcome| {
            callback(match outcome {
                Ok(Response::Heartbeat(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::HEARTBEAT, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn meter_values<F>(
        &self,
        request: MeterValuesRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<MeterValuesResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::MeterValues(request), move |outcome| {
            callback(match outcome {
                Ok(Response::MeterValues(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::METER_VALUES, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn start_transaction<F>(
        &self,
        request: StartTransactionRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<StartTransactionResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::StartTransaction(request), move |outcome| {
            callback(match outcome {
                Ok(Response::StartTransaction(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::START_TRANSACTION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn status_notification<F>(
        &self,
        request: StatusNotificationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<StatusNotificationResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::StatusNotification(request), move |outcome| {
            callback(match outcome {
                Ok(Response::StatusNotification(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::STATUS_NOTIFICATION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn stop_transaction<F>(
        &self,
        request: StopTransactionRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<StopTransactionResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::StopTransaction(request), move |outcome| {
            callback(match outcome {
                Ok(Response::StopTransaction(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(core::STOP_TRANSACTION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    // ── FirmwareManagement profile ─────────────────────────

    pub fn diagnostics_status_notification<F>(
        &self,
        request: DiagnosticsStatusNotificationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<DiagnosticsStatusNotificationResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::DiagnosticsStatusNotification(request), move |outcome| {
            callback(match outcome {
                Ok(Response::DiagnosticsStatusNotification(response)) => Ok(response),
                Ok(other) => {
                    Err(unexpected_response(firmware::DIAGNOSTICS_STATUS_NOTIFICATION, &other))
                }
                Err(error) => Err(error),
            })
        })
    }

    pub fn firmware_status_notification<F>(
        &self,
        request: FirmwareStatusNotificationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<FirmwareStatusNotificationResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::FirmwareStatusNotification(request), move |outcome| {
            callback(match outcome {
                Ok(Response::FirmwareStatusNotification(response)) => Ok(response),
                Ok(other) => {
                    Err(unexpected_response(firmware::FIRMWARE_STATUS_NOTIFICATION, &other))
                }
                Err(error) => Err(error),
            })
        })
    }

    // ── Security extension profiles ────────────────────────

    pub fn sign_certificate<F>(
        &self,
        request: SignCertificateRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<SignCertificateResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::SignCertificate(request), move |outcome| {
            callback(match outcome {
                Ok(Response::SignCertificate(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(security::SIGN_CERTIFICATE, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn security_event_notification<F>(
        &self,
        request: SecurityEventNotificationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<SecurityEventNotificationResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::SecurityEventNotification(request), move |outcome| {
            callback(match outcome {
                Ok(Response::SecurityEventNotification(response)) => Ok(response),
                Ok(other) => {
                    Err(unexpected_response(security::SECURITY_EVENT_NOTIFICATION, &other))
                }
                Err(error) => Err(error),
            })
        })
    }

    pub fn log_status_notification<F>(
        &self,
        request: LogStatusNotificationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<LogStatusNotificationResponse, OcppError>) + Send + 'static,
    {
        self.send(Request::LogStatusNotification(request), move |outcome| {
            callback(match outcome {
                Ok(Response::LogStatusNotification(response)) => Ok(response),
                Ok(other) => Err(unexpected_response(logging::LOG_STATUS_NOTIFICATION, &other)),
                Err(error) => Err(error),
            })
        })
    }

    pub fn signed_firmware_status_notification<F>(
        &self,
        request: SignedFirmwareStatusNotificationRequest,
        callback: F,
    ) -> Result<(), OcppError>
    where
        F: FnOnce(Result<SignedFirmwareStatusNotificationResponse, OcppError>) + Send + 'static,
    {
        self.send(
            Request::SignedFirmwareStatusNotification(request),
            move |outcome| {
                callback(match outcome {
                    Ok(Response::SignedFirmwareStatusNotification(response)) => Ok(response),
                    Ok(other) => Err(unexpected_response(
                        secure_firmware::SIGNED_FIRMWARE_STATUS_NOTIFICATION,
                        &other,
                    )),
                    Err(error) => Err(error),
                })
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rust_ocpp::v1_6::types::DataTransferStatus;

    use super::*;
    use crate::support::ocpp_frame::OcppFrame;
    use crate::transport::mock::MockClientTransport;

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
        vendors: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CoreHandler for TestCore {
        async fn on_data_transfer(
            &self,
            request: DataTransferRequest,
        ) -> HandlerResult<DataTransferResponse> {
            self.vendors.lock().unwrap().push(request.vendor_string.clone());
            Ok(Some(DataTransferResponse {
                status: DataTransferStatus::Accepted,
                data: None,
            }))
        }
    }

    async fn started(builder: ChargePointBuilder) -> ChargePoint {
        crate::support::init_test_tracing();
        let charge_point = builder.build();
        charge_point.start().await.unwrap();
        charge_point
    }

    fn base_builder(transport: Arc<MockClientTransport>) -> ChargePointBuilder {
        ChargePoint::builder(ChargePointConfig::default())
            .with_transport(transport)
            .with_call_timeout(None)
    }

    #[tokio::test]
    async fn heartbeat_roundtrip_delivers_typed_response() {
        let transport = MockClientTransport::new();
        let cp = started(base_builder(transport.clone())).await;

        let current_time = Arc::new(Mutex::new(None));
        let sink = current_time.clone();
        cp.heartbeat(HeartbeatRequest {}, move |outcome| {
            *sink.lock().unwrap() = Some(outcome.unwrap().current_time);
        })
        .unwrap();

        let frames = transport.sent_frames();
        assert_eq!(frames.len(), 1);
        let unique_id = match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::Call {
                unique_id, action, ..
            } => {
                assert_eq!(action, "Heartbeat");
                unique_id
            }
            other => panic!("expected Call, got {:?}", other),
        };

        transport.inject_message(&format!(
            r#"[3,"{unique_id}",{{"currentTime":"2024-06-01T10:00:00Z"}}]"#
        ));
        assert!(current_time.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn inbound_data_transfer_reaches_core_handler() {
        let transport = MockClientTransport::new();
        let vendors = Arc::new(Mutex::new(Vec::new()));
        let cp = started(base_builder(transport.clone()).with_core_handler(Arc::new(TestCore {
            vendors: vendors.clone(),
        })))
        .await;

        transport.inject_message(r#"[2,"dt1","DataTransfer",{"vendorId":"ACME"}]"#);
        wait_until(|| !transport.sent_frames().is_empty()).await;

        assert_eq!(*vendors.lock().unwrap(), vec!["ACME"]);
        let frames = transport.sent_frames();
        match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::CallResult { unique_id, payload } => {
                assert_eq!(unique_id, "dt1");
                assert_eq!(payload["status"], "Accepted");
            }
            other => panic!("expected CallResult, got {:?}", other),
        }
        drop(cp);
    }

    #[tokio::test]
    async fn unhandled_inbound_action_yields_not_supported() {
        let transport = MockClientTransport::new();
        // No core handler registered at all.
        let _cp = started(base_builder(transport.clone())).await;

        transport.inject_message(r#"[2,"r1","Reset",{"type":"Soft"}]"#);
        wait_until(|| !transport.sent_frames().is_empty()).await;

        let frames = transport.sent_frames();
        match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                assert_eq!(unique_id, "r1");
                assert_eq!(error_code, "NotSupported");
                assert!(error_description.contains("Reset"));
            }
            other => panic!("expected CallError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_inbound_action_yields_not_implemented() {
        let transport = MockClientTransport::new();
        let _cp = started(base_builder(transport.clone())).await;

        transport.inject_message(r#"[2,"u1","NoSuchAction",{}]"#);

        let frames = transport.sent_frames();
        assert_eq!(frames.len(), 1);
        match OcppFrame::parse(&frames[0]).unwrap() {
            OcppFrame::CallError { error_code, .. } => {
                assert_eq!(error_code, "NotImplemented");
            }
            other => panic!("expected CallError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn central_system_actions_cannot_be_sent_from_charge_point() {
        let transport = MockClientTransport::new();
        let cp = started(base_builder(transport.clone())).await;

        let error = cp
            .send(
                Request::Reset(ResetRequest {
                    kind: rust_ocpp::v1_6::types::ResetRequestStatus::Soft,
                }),
                |_| panic!("callback must not fire for rejected sends"),
            )
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::NotSupported);
        assert!(error.description.contains("cannot send request"));
        assert!(transport.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn disconnect_cancels_outstanding_calls_in_order() {
        let transport = MockClientTransport::new();
        let cp = started(base_builder(transport.clone())).await;

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        for i in 1..=2u32 {
            let outcomes = outcomes.clone();
            cp.heartbeat(HeartbeatRequest {}, move |outcome| {
                let error = outcome.unwrap_err();
                outcomes.lock().unwrap().push((i, error.code));
            })
            .unwrap();
        }
        assert_eq!(transport.sent_frames().len(), 1);

        transport.inject_disconnect();

        let recorded = outcomes.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![(1, ErrorCode::GenericError), (2, ErrorCode::GenericError)]
        );
        // Fresh calls work again after a reconnect-style drain.
        cp.heartbeat(HeartbeatRequest {}, |_| {}).unwrap();
        assert_eq!(transport.sent_frames().len(), 2);
    }

    #[tokio::test]
    async fn disconnect_hook_runs_after_cancellation() {
        let transport = MockClientTransport::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let hook_events = events.clone();
        let cp = started(
            base_builder(transport.clone()).on_disconnect(move || {
                hook_events.lock().unwrap().push("hook".to_string());
            }),
        )
        .await;

        let callback_events = events.clone();
        cp.heartbeat(HeartbeatRequest {}, move |_| {
            callback_events.lock().unwrap().push("cancelled".to_string());
        })
        .unwrap();

        transport.inject_disconnect();
        assert_eq!(*events.lock().unwrap(), vec!["cancelled", "hook"]);
    }
}
