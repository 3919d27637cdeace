//! OCPP 1.6 security-extension message payloads.
//!
//! The standard 28 messages come from `rust_ocpp::v1_6::messages`; the
//! security whitepaper actions (certificates, signed firmware, logging,
//! extended trigger) are not part of that crate and are defined here with
//! the same layout: one module per message, `*Request`/`*Response` pairs.

pub mod certificate_signed;
pub mod delete_certificate;
pub mod extended_trigger_message;
pub mod get_installed_certificate_ids;
pub mod get_log;
pub mod install_certificate;
pub mod log_status_notification;
pub mod security_event_notification;
pub mod sign_certificate;
pub mod signed_firmware_status_notification;
pub mod signed_update_firmware;
pub mod types;

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use validator::Validate;

    use super::get_log::GetLogRequest;
    use super::signed_update_firmware::SignedUpdateFirmwareRequest;
    use super::types::{Firmware, LogParameters, LogType};

    #[test]
    fn get_log_wire_shape() {
        let request = GetLogRequest {
            log: LogParameters {
                remote_location: "ftp://logs.example.com/cp001".into(),
                oldest_timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                latest_timestamp: None,
            },
            log_type: LogType::SecurityLog,
            request_id: 42,
            retries: None,
            retry_interval: None,
        };
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["logType"], "SecurityLog");
        assert_eq!(v["requestId"], 42);
        assert_eq!(v["log"]["remoteLocation"], "ftp://logs.example.com/cp001");
        assert!(v["log"].get("latestTimestamp").is_none());
        assert!(v.get("retries").is_none());
    }

    #[test]
    fn get_log_roundtrip() {
        let text = r#"{"log":{"remoteLocation":"https://x/y"},"logType":"DiagnosticsLog","requestId":1}"#;
        let request: GetLogRequest = serde_json::from_str(text).unwrap();
        assert_eq!(request.log_type, LogType::DiagnosticsLog);
        assert_eq!(request.request_id, 1);
        assert!(request.log.oldest_timestamp.is_none());
        let back = serde_json::to_value(&request).unwrap();
        assert_eq!(back["log"]["remoteLocation"], "https://x/y");
    }

    #[test]
    fn nested_constraint_violations_surface() {
        let request = SignedUpdateFirmwareRequest {
            retries: None,
            retry_interval: None,
            request_id: 7,
            firmware: Firmware {
                location: "l".repeat(513),
                retrieve_date_time: Utc::now(),
                install_date_time: None,
                signing_certificate: "cert".into(),
                signature: "sig".into(),
            },
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn security_event_type_field_renamed() {
        let text = r#"{"type":"SettingSystemTime","timestamp":"2024-06-01T10:00:00Z"}"#;
        let request: super::security_event_notification::SecurityEventNotificationRequest =
            serde_json::from_str(text).unwrap();
        assert_eq!(request.kind, "SettingSystemTime");
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["type"], "SettingSystemTime");
        assert!(v.get("techInfo").is_none());
    }
}
