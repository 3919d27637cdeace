//! Typed request/response unions over the full OCPP 1.6 action set.
//!
//! One variant per feature, wrapping the concrete payload type: the 28
//! standard messages from `rust_ocpp::v1_6`, the security-extension
//! messages from [`crate::messages`]. These unions are what flows through
//! the endpoint: the codec decodes into them, handlers match on them, and
//! the shells downcast them back to the concrete types.

use serde_json::Value;

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

use crate::support::errors::{ErrorCode, OcppError};

use super::{
    certificates, core, extended_trigger, firmware, local_auth, logging, remote_trigger,
    reservation, secure_firmware, security, smart_charging,
};

/// A typed OCPP 1.6 request, one variant per feature.
#[derive(Debug, Clone)]
pub enum Request {
    Authorize(AuthorizeRequest),
    BootNotification(BootNotificationRequest),
    CancelReservation(CancelReservationRequest),
    CertificateSigned(CertificateSignedRequest),
    ChangeAvailability(ChangeAvailabilityRequest),
    ChangeConfiguration(ChangeConfigurationRequest),
    ClearCache(ClearCacheRequest),
    ClearChargingProfile(ClearChargingProfileRequest),
    DataTransfer(DataTransferRequest),
    DeleteCertificate(DeleteCertificateRequest),
    DiagnosticsStatusNotification(DiagnosticsStatusNotificationRequest),
    ExtendedTriggerMessage(ExtendedTriggerMessageRequest),
    FirmwareStatusNotification(FirmwareStatusNotificationRequest),
    GetCompositeSchedule(GetCompositeScheduleRequest),
    GetConfiguration(GetConfigurationRequest),
    GetDiagnostics(GetDiagnosticsRequest),
    GetInstalledCertificateIds(GetInstalledCertificateIdsRequest),
    GetLocalListVersion(GetLocalListVersionRequest),
    GetLog(GetLogRequest),
    Heartbeat(HeartbeatRequest),
    InstallCertificate(InstallCertificateRequest),
    LogStatusNotification(LogStatusNotificationRequest),
    MeterValues(MeterValuesRequest),
    RemoteStartTransaction(RemoteStartTransactionRequest),
    RemoteStopTransaction(RemoteStopTransactionRequest),
    ReserveNow(ReserveNowRequest),
    Reset(ResetRequest),
    SecurityEventNotification(SecurityEventNotificationRequest),
    SendLocalList(SendLocalListRequest),
    SetChargingProfile(SetChargingProfileRequest),
    SignCertificate(SignCertificateRequest),
    SignedFirmwareStatusNotification(SignedFirmwareStatusNotificationRequest),
    SignedUpdateFirmware(SignedUpdateFirmwareRequest),
    StartTransaction(StartTransactionRequest),
    StatusNotification(StatusNotificationRequest),
    StopTransaction(StopTransactionRequest),
    TriggerMessage(TriggerMessageRequest),
    UnlockConnector(UnlockConnectorRequest),
    UpdateFirmware(UpdateFirmwareRequest),
}

/// A typed OCPP 1.6 response (confirmation), one variant per feature.
#[derive(Debug, Clone)]
pub enum Response {
    Authorize(AuthorizeResponse),
    BootNotification(BootNotificationResponse),
    CancelReservation(CancelReservationResponse),
    CertificateSigned(CertificateSignedResponse),
    ChangeAvailability(ChangeAvailabilityResponse),
    ChangeConfiguration(ChangeConfigurationResponse),
    ClearCache(ClearCacheResponse),
    ClearChargingProfile(ClearChargingProfileResponse),
    DataTransfer(DataTransferResponse),
    DeleteCertificate(DeleteCertificateResponse),
    DiagnosticsStatusNotification(DiagnosticsStatusNotificationResponse),
    ExtendedTriggerMessage(ExtendedTriggerMessageResponse),
    FirmwareStatusNotification(FirmwareStatusNotificationResponse),
    GetCompositeSchedule(GetCompositeScheduleResponse),
    GetConfiguration(GetConfigurationResponse),
    GetDiagnostics(GetDiagnosticsResponse),
    GetInstalledCertificateIds(GetInstalledCertificateIdsResponse),
    GetLocalListVersion(GetLocalListVersionResponse),
    GetLog(GetLogResponse),
    Heartbeat(HeartbeatResponse),
    InstallCertificate(InstallCertificateResponse),
    LogStatusNotification(LogStatusNotificationResponse),
    MeterValues(MeterValuesResponse),
    RemoteStartTransaction(RemoteStartTransactionResponse),
    RemoteStopTransaction(RemoteStopTransactionResponse),
    ReserveNow(ReserveNowResponse),
    Reset(ResetResponse),
    SecurityEventNotification(SecurityEventNotificationResponse),
    SendLocalList(SendLocalListResponse),
    SetChargingProfile(SetChargingProfileResponse),
    SignCertificate(SignCertificateResponse),
    SignedFirmwareStatusNotification(SignedFirmwareStatusNotificationResponse),
    SignedUpdateFirmware(SignedUpdateFirmwareResponse),
    StartTransaction(StartTransactionResponse),
    StatusNotification(StatusNotificationResponse),
    StopTransaction(StopTransactionResponse),
    TriggerMessage(TriggerMessageResponse),
    UnlockConnector(UnlockConnectorResponse),
    UpdateFirmware(UpdateFirmwareResponse),
}

fn encode<T: serde::Serialize>(payload: &T) -> Result<Value, OcppError> {
    serde_json::to_value(payload)
        .map_err(|e| OcppError::new(ErrorCode::FormationViolation, e.to_string()))
}

/// Encode plus constraint validation, for the in-crate message types that
/// carry `validator` rules. Mirrors the `decode_checked` enforcement on the
/// inbound path: a payload violating its schema never reaches the wire.
fn encode_checked<T: serde::Serialize + validator::Validate>(
    payload: &T,
) -> Result<Value, OcppError> {
    payload
        .validate()
        .map_err(|e| OcppError::new(ErrorCode::FormationViolation, e.to_string()))?;
    encode(payload)
}

impl Request {
    /// The OCPP action name of this request.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Authorize(_) => core::AUTHORIZE,
            Self::BootNotification(_) => core::BOOT_NOTIFICATION,
            Self::CancelReservation(_) => reservation::CANCEL_RESERVATION,
            Self::CertificateSigned(_) => security::CERTIFICATE_SIGNED,
            Self::ChangeAvailability(_) => core::CHANGE_AVAILABILITY,
            Self::ChangeConfiguration(_) => core::CHANGE_CONFIGURATION,
            Self::ClearCache(_) => core::CLEAR_CACHE,
            Self::ClearChargingProfile(_) => smart_charging::CLEAR_CHARGING_PROFILE,
            Self::DataTransfer(_) => core::DATA_TRANSFER,
            Self::DeleteCertificate(_) => certificates::DELETE_CERTIFICATE,
            Self::DiagnosticsStatusNotification(_) => firmware::DIAGNOSTICS_STATUS_NOTIFICATION,
            Self::ExtendedTriggerMessage(_) => extended_trigger::EXTENDED_TRIGGER_MESSAGE,
            Self::FirmwareStatusNotification(_) => firmware::FIRMWARE_STATUS_NOTIFICATION,
            Self::GetCompositeSchedule(_) => smart_charging::GET_COMPOSITE_SCHEDULE,
            Self::GetConfiguration(_) => core::GET_CONFIGURATION,
            Self::GetDiagnostics(_) => firmware::GET_DIAGNOSTICS,
            Self::GetInstalledCertificateIds(_) => certificates::GET_INSTALLED_CERTIFICATE_IDS,
            Self::GetLocalListVersion(_) => local_auth::GET_LOCAL_LIST_VERSION,
            Self::GetLog(_) => logging::GET_LOG,
            Self::Heartbeat(_) => core::HEARTBEAT,
            Self::InstallCertificate(_) => certificates::INSTALL_CERTIFICATE,
            Self::LogStatusNotification(_) => logging::LOG_STATUS_NOTIFICATION,
            Self::MeterValues(_) => core::METER_VALUES,
            Self::RemoteStartTransaction(_) => core::REMOTE_START_TRANSACTION,
            Self::RemoteStopTransaction(_) => core::REMOTE_STOP_TRANSACTION,
            Self::ReserveNow(_) => reservation::RESERVE_NOW,
            Self::Reset(_) => core::RESET,
            Self::SecurityEventNotification(_) => security::SECURITY_EVENT_NOTIFICATION,
            Self::SendLocalList(_) => local_auth::SEND_LOCAL_LIST,
            Self::SetChargingProfile(_) => smart_charging::SET_CHARGING_PROFILE,
            Self::SignCertificate(_) => security::SIGN_CERTIFICATE,
            Self::SignedFirmwareStatusNotification(_) => {
                secure_firmware::SIGNED_FIRMWARE_STATUS_NOTIFICATION
            }
            Self::SignedUpdateFirmware(_) => secure_firmware::SIGNED_UPDATE_FIRMWARE,
            Self::StartTransaction(_) => core::START_TRANSACTION,
            Self::StatusNotification(_) => core::STATUS_NOTIFICATION,
            Self::StopTransaction(_) => core::STOP_TRANSACTION,
            Self::TriggerMessage(_) => remote_trigger::TRIGGER_MESSAGE,
            Self::UnlockConnector(_) => core::UNLOCK_CONNECTOR,
            Self::UpdateFirmware(_) => firmware::UPDATE_FIRMWARE,
        }
    }

    /// Serialize the inner payload to the wire JSON object. Fails with
    /// `FormationViolation` when the payload violates its schema.
    pub fn to_payload(&self) -> Result<Value, OcppError> {
        match self {
            Self::Authorize(p) => encode(p),
            Self::BootNotification(p) => encode(p),
            Self::CancelReservation(p) => encode(p),
            Self::CertificateSigned(p) => encode_checked(p),
            Self::ChangeAvailability(p) => encode(p),
            Self::ChangeConfiguration(p) => encode(p),
            Self::ClearCache(p) => encode(p),
            Self::ClearChargingProfile(p) => encode(p),
            Self::DataTransfer(p) => encode(p),
            Self::DeleteCertificate(p) => encode_checked(p),
            Self::DiagnosticsStatusNotification(p) => encode(p),
            Self::ExtendedTriggerMessage(p) => encode(p),
            Self::FirmwareStatusNotification(p) => encode(p),
            Self::GetCompositeSchedule(p) => encode(p),
            Self::GetConfiguration(p) => encode(p),
            Self::GetDiagnostics(p) => encode(p),
            Self::GetInstalledCertificateIds(p) => encode(p),
            Self::GetLocalListVersion(p) => encode(p),
            Self::GetLog(p) => encode_checked(p),
            Self::Heartbeat(p) => encode(p),
            Self::InstallCertificate(p) => encode_checked(p),
            Self::LogStatusNotification(p) => encode(p),
            Self::MeterValues(p) => encode(p),
            Self::RemoteStartTransaction(p) => encode(p),
            Self::RemoteStopTransaction(p) => encode(p),
            Self::ReserveNow(p) => encode(p),
            Self::Reset(p) => encode(p),
            Self::SecurityEventNotification(p) => encode_checked(p),
            Self::SendLocalList(p) => encode(p),
            Self::SetChargingProfile(p) => encode(p),
            Self::SignCertificate(p) => encode_checked(p),
            Self::SignedFirmwareStatusNotification(p) => encode(p),
            Self::SignedUpdateFirmware(p) => encode_checked(p),
            Self::StartTransaction(p) => encode(p),
            Self::StatusNotification(p) => encode(p),
            Self::StopTransaction(p) => encode(p),
            Self::TriggerMessage(p) => encode(p),
            Self::UnlockConnector(p) => encode(p),
            Self::UpdateFirmware(p) => encode(p),
        }
    }
}

impl Response {
    /// The OCPP action name this response confirms.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Authorize(_) => core::AUTHORIZE,
            Self::BootNotification(_) => core::BOOT_NOTIFICATION,
            Self::CancelReservation(_) => reservation::CANCEL_RESERVATION,
            Self::CertificateSigned(_) => security::CERTIFICATE_SIGNED,
            Self::ChangeAvailability(_) => core::CHANGE_AVAILABILITY,
            Self::ChangeConfiguration(_) => core::CHANGE_CONFIGURATION,
            Self::ClearCache(_) => core::CLEAR_CACHE,
            Self::ClearChargingProfile(_) => smart_charging::CLEAR_CHARGING_PROFILE,
            Self::DataTransfer(_) => core::DATA_TRANSFER,
            Self::DeleteCertificate(_) => certificates::DELETE_CERTIFICATE,
            Self::DiagnosticsStatusNotification(_) => firmware::DIAGNOSTICS_STATUS_NOTIFICATION,
            Self::ExtendedTriggerMessage(_) => extended_trigger::EXTENDED_TRIGGER_MESSAGE,
            Self::FirmwareStatusNotification(_) => firmware::FIRMWARE_STATUS_NOTIFICATION,
            Self::GetCompositeSchedule(_) => smart_charging::GET_COMPOSITE_SCHEDULE,
            Self::GetConfiguration(_) => core::GET_CONFIGURATION,
            Self::GetDiagnostics(_) => firmware::GET_DIAGNOSTICS,
            Self::GetInstalledCertificateIds(_) => certificates::GET_INSTALLED_CERTIFICATE_IDS,
            Self::GetLocalListVersion(_) => local_auth::GET_LOCAL_LIST_VERSION,
            Self::GetLog(_) => logging::GET_LOG,
            Self::Heartbeat(_) => core::HEARTBEAT,
            Self::InstallCertificate(_) => certificates::INSTALL_CERTIFICATE,
            Self::LogStatusNotification(_) => logging::LOG_STATUS_NOTIFICATION,
            Self::MeterValues(_) => core::METER_VALUES,
            Self::RemoteStartTransaction(_) => core::REMOTE_START_TRANSACTION,
            Self::RemoteStopTransaction(_) => core::REMOTE_STOP_TRANSACTION,
            Self::ReserveNow(_) => reservation::RESERVE_NOW,
            Self::Reset(_) => core::RESET,
            Self::SecurityEventNotification(_) => security::SECURITY_EVENT_NOTIFICATION,
            Self::SendLocalList(_) => local_auth::SEND_LOCAL_LIST,
            Self::SetChargingProfile(_) => smart_charging::SET_CHARGING_PROFILE,
            Self::SignCertificate(_) => security::SIGN_CERTIFICATE,
            Self::SignedFirmwareStatusNotification(_) => {
                secure_firmware::SIGNED_FIRMWARE_STATUS_NOTIFICATION
            }
            Self::SignedUpdateFirmware(_) => secure_firmware::SIGNED_UPDATE_FIRMWARE,
            Self::StartTransaction(_) => core::START_TRANSACTION,
            Self::StatusNotification(_) => core::STATUS_NOTIFICATION,
            Self::StopTransaction(_) => core::STOP_TRANSACTION,
            Self::TriggerMessage(_) => remote_trigger::TRIGGER_MESSAGE,
            Self::UnlockConnector(_) => core::UNLOCK_CONNECTOR,
            Self::UpdateFirmware(_) => firmware::UPDATE_FIRMWARE,
        }
    }

    /// Serialize the inner payload to the wire JSON object. Fails with
    /// `FormationViolation` when the payload violates its schema.
    pub fn to_payload(&self) -> Result<Value, OcppError> {
        match self {
            Self::Authorize(p) => encode(p),
            Self::BootNotification(p) => encode(p),
            Self::CancelReservation(p) => encode(p),
            Self::CertificateSigned(p) => encode(p),
            Self::ChangeAvailability(p) => encode(p),
            Self::ChangeConfiguration(p) => encode(p),
            Self::ClearCache(p) => encode(p),
            Self::ClearChargingProfile(p) => encode(p),
            Self::DataTransfer(p) => encode(p),
            Self::DeleteCertificate(p) => encode(p),
            Self::DiagnosticsStatusNotification(p) => encode(p),
            Self::ExtendedTriggerMessage(p) => encode(p),
            Self::FirmwareStatusNotification(p) => encode(p),
            Self::GetCompositeSchedule(p) => encode(p),
            Self::GetConfiguration(p) => encode(p),
            Self::GetDiagnostics(p) => encode(p),
            Self::GetInstalledCertificateIds(p) => encode(p),
            Self::GetLocalListVersion(p) => encode(p),
            Self::GetLog(p) => encode_checked(p),
            Self::Heartbeat(p) => encode(p),
            Self::InstallCertificate(p) => encode(p),
            Self::LogStatusNotification(p) => encode(p),
            Self::MeterValues(p) => encode(p),
            Self::RemoteStartTransaction(p) => encode(p),
            Self::RemoteStopTransaction(p) => encode(p),
            Self::ReserveNow(p) => encode(p),
            Self::Reset(p) => encode(p),
            Self::SecurityEventNotification(p) => encode(p),
            Self::SendLocalList(p) => encode(p),
            Self::SetChargingProfile(p) => encode(p),
            Self::SignCertificate(p) => encode(p),
            Self::SignedFirmwareStatusNotification(p) => encode(p),
            Self::SignedUpdateFirmware(p) => encode(p),
            Self::StartTransaction(p) => encode(p),
            Self::StatusNotification(p) => encode(p),
            Self::StopTransaction(p) => encode(p),
            Self::TriggerMessage(p) => encode(p),
            Self::UnlockConnector(p) => encode(p),
            Self::UpdateFirmware(p) => encode(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_ocpp::v1_6::types::ResetRequestStatus;

    use super::*;

    #[test]
    fn request_action_names() {
        let request = Request::Reset(ResetRequest {
            kind: ResetRequestStatus::Soft,
        });
        assert_eq!(request.action(), "Reset");

        let request = Request::ClearCache(ClearCacheRequest {});
        assert_eq!(request.action(), "ClearCache");

        let request = Request::Heartbeat(HeartbeatRequest {});
        assert_eq!(request.action(), "Heartbeat");
    }

    #[test]
    fn reset_payload_shape() {
        let request = Request::Reset(ResetRequest {
            kind: ResetRequestStatus::Hard,
        });
        let payload = request.to_payload().unwrap();
        assert_eq!(payload["type"], "Hard");
    }

    #[test]
    fn heartbeat_response_action() {
        let response = Response::Heartbeat(HeartbeatResponse {
            current_time: chrono::Utc::now(),
        });
        assert_eq!(response.action(), "Heartbeat");
        assert!(response.to_payload().unwrap().get("currentTime").is_some());
    }

    #[test]
    fn oversized_outbound_payload_is_formation_violation() {
        let request = Request::SignCertificate(SignCertificateRequest {
            csr: "x".repeat(6000),
        });
        let err = request.to_payload().unwrap_err();
        assert_eq!(err.code, ErrorCode::FormationViolation);
    }

    #[test]
    fn nested_outbound_constraint_violation_is_caught() {
        let request = Request::SignedUpdateFirmware(SignedUpdateFirmwareRequest {
            retries: None,
            retry_interval: None,
            request_id: 7,
            firmware: crate::messages::types::Firmware {
                location: "l".repeat(513),
                retrieve_date_time: chrono::Utc::now(),
                install_date_time: None,
                signing_certificate: "cert".into(),
                signature: "sig".into(),
            },
        });
        let err = request.to_payload().unwrap_err();
        assert_eq!(err.code, ErrorCode::FormationViolation);
    }

    #[test]
    fn valid_outbound_extension_payload_encodes() {
        let request = Request::SignCertificate(SignCertificateRequest {
            csr: "-----BEGIN CERTIFICATE REQUEST-----".into(),
        });
        let payload = request.to_payload().unwrap();
        assert_eq!(payload["csr"], "-----BEGIN CERTIFICATE REQUEST-----");
    }
}
