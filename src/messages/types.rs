//! Shared types for the OCPP 1.6 security-extension messages.
//!
//! `rust_ocpp::v1_6` covers the 28 standard messages only; the security
//! whitepaper additions below follow the same serde conventions (camelCase
//! field names, enum variants serialized verbatim).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Generic Accepted/Rejected status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenericStatus {
    Accepted,
    Rejected,
}

/// Status returned for a CertificateSigned request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateSignedStatus {
    Accepted,
    Rejected,
}

/// Status returned for a DeleteCertificate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteCertificateStatus {
    Accepted,
    Failed,
    NotFound,
}

/// Status returned for a GetInstalledCertificateIds request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GetInstalledCertificateStatus {
    Accepted,
    NotFound,
}

/// Status returned for an InstallCertificate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallCertificateStatus {
    Accepted,
    Failed,
    Rejected,
}

/// Certificate category addressed by the certificate management actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateUse {
    CentralSystemRootCertificate,
    ManufacturerRootCertificate,
}

/// Hash algorithm used in [`CertificateHashData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    SHA256,
    SHA384,
    SHA512,
}

/// Identifies an installed certificate by its issuer hashes and serial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CertificateHashData {
    pub hash_algorithm: HashAlgorithm,
    #[validate(length(max = 128))]
    pub issuer_name_hash: String,
    #[validate(length(max = 128))]
    pub issuer_key_hash: String,
    #[validate(length(max = 40))]
    pub serial_number: String,
}

/// Kind of log requested by GetLog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogType {
    DiagnosticsLog,
    SecurityLog,
}

/// Status returned for a GetLog request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStatus {
    Accepted,
    Rejected,
    AcceptedCanceled,
}

/// Upload progress reported via LogStatusNotification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadLogStatus {
    BadMessage,
    Idle,
    NotSupportedOperation,
    PermissionDenied,
    Uploaded,
    UploadFailure,
    Uploading,
}

/// Upload location and time window for a requested log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogParameters {
    #[validate(length(max = 512))]
    pub remote_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_timestamp: Option<DateTime<Utc>>,
}

/// A signed firmware image descriptor (SignedUpdateFirmware).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Firmware {
    #[validate(length(max = 512))]
    pub location: String,
    pub retrieve_date_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_date_time: Option<DateTime<Utc>>,
    #[validate(length(max = 5500))]
    pub signing_certificate: String,
    #[validate(length(max = 800))]
    pub signature: String,
}

/// Status returned for a SignedUpdateFirmware request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateFirmwareStatus {
    Accepted,
    Rejected,
    AcceptedCanceled,
    InvalidCertificate,
    RevokedCertificate,
}

/// Firmware installation progress reported via
/// SignedFirmwareStatusNotification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignedFirmwareStatus {
    Downloaded,
    DownloadFailed,
    Downloading,
    DownloadScheduled,
    DownloadPaused,
    Idle,
    InstallationFailed,
    Installing,
    Installed,
    InstallRebooting,
    InstallScheduled,
    InstallVerificationFailed,
    InvalidSignature,
    SignatureVerified,
}

/// Message kinds a central system may request via ExtendedTriggerMessage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageTriggerExt {
    BootNotification,
    LogStatusNotification,
    FirmwareStatusNotification,
    Heartbeat,
    MeterValues,
    SignChargePointCertificate,
    StatusNotification,
}

/// Status returned for an ExtendedTriggerMessage request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendedTriggerMessageStatus {
    Accepted,
    Rejected,
    NotImplemented,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_hash_data_wire_shape() {
        let data = CertificateHashData {
            hash_algorithm: HashAlgorithm::SHA256,
            issuer_name_hash: "aa".into(),
            issuer_key_hash: "bb".into(),
            serial_number: "01".into(),
        };
        let v = serde_json::to_value(&data).unwrap();
        assert_eq!(v["hashAlgorithm"], "SHA256");
        assert_eq!(v["issuerNameHash"], "aa");
        assert_eq!(v["serialNumber"], "01");
    }

    #[test]
    fn enum_variants_serialize_verbatim() {
        assert_eq!(
            serde_json::to_value(LogStatus::AcceptedCanceled).unwrap(),
            "AcceptedCanceled"
        );
        assert_eq!(
            serde_json::to_value(UploadLogStatus::NotSupportedOperation).unwrap(),
            "NotSupportedOperation"
        );
        assert_eq!(
            serde_json::to_value(MessageTriggerExt::SignChargePointCertificate).unwrap(),
            "SignChargePointCertificate"
        );
    }

    #[test]
    fn oversized_serial_number_fails_validation() {
        let data = CertificateHashData {
            hash_algorithm: HashAlgorithm::SHA256,
            issuer_name_hash: "aa".into(),
            issuer_key_hash: "bb".into(),
            serial_number: "9".repeat(41),
        };
        assert!(validator::Validate::validate(&data).is_err());
    }
}
