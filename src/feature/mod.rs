//! Feature registry and profile definitions.
//!
//! A *feature* is a named request/response pair (`BootNotification`,
//! `Reset`, ...); a *profile* is the bundle of features both peers must
//! enable to use them. The registry is built once, before the endpoint
//! starts, from the set of enabled profiles, and drives payload decoding
//! and direction checks.

pub mod certificates;
pub mod core;
pub mod extended_trigger;
pub mod firmware;
pub mod local_auth;
pub mod logging;
mod message;
pub mod remote_trigger;
pub mod reservation;
pub mod secure_firmware;
pub mod security;
pub mod smart_charging;

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use crate::support::errors::{ErrorCode, OcppError};

pub use message::{Request, Response};

/// The eleven OCPP 1.6 feature profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Core,
    LocalAuth,
    Firmware,
    Reservation,
    RemoteTrigger,
    SmartCharging,
    Security,
    SecureFirmware,
    Logging,
    Certificates,
    ExtendedTriggerMessage,
}

impl Profile {
    /// All profiles, in registration order.
    pub const ALL: [Profile; 11] = [
        Profile::Core,
        Profile::LocalAuth,
        Profile::Firmware,
        Profile::Reservation,
        Profile::RemoteTrigger,
        Profile::SmartCharging,
        Profile::Security,
        Profile::SecureFirmware,
        Profile::Logging,
        Profile::Certificates,
        Profile::ExtendedTriggerMessage,
    ];

    /// The profile name as announced in `SupportedFeatureProfiles`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Core => "Core",
            Self::LocalAuth => "LocalAuthListManagement",
            Self::Firmware => "FirmwareManagement",
            Self::Reservation => "Reservation",
            Self::RemoteTrigger => "RemoteTrigger",
            Self::SmartCharging => "SmartCharging",
            Self::Security => "Security",
            Self::SecureFirmware => "SecureFirmwareUpdate",
            Self::Logging => "Logging",
            Self::Certificates => "Certificates",
            Self::ExtendedTriggerMessage => "ExtendedTriggerMessage",
        }
    }

    fn features(&self) -> Vec<FeatureDescriptor> {
        match self {
            Self::Core => core::features(),
            Self::LocalAuth => local_auth::features(),
            Self::Firmware => firmware::features(),
            Self::Reservation => reservation::features(),
            Self::RemoteTrigger => remote_trigger::features(),
            Self::SmartCharging => smart_charging::features(),
            Self::Security => security::features(),
            Self::SecureFirmware => secure_firmware::features(),
            Self::Logging => logging::features(),
            Self::Certificates => certificates::features(),
            Self::ExtendedTriggerMessage => extended_trigger::features(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The two endpoint roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    CentralSystem,
    ChargePoint,
}

/// Which role may initiate a feature's CALL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiator {
    CentralSystem,
    ChargePoint,
    /// Either side may initiate (DataTransfer).
    Any,
}

impl Initiator {
    /// Whether `role` may send this feature's request.
    pub fn allows(&self, role: Role) -> bool {
        match self {
            Self::Any => true,
            Self::CentralSystem => role == Role::CentralSystem,
            Self::ChargePoint => role == Role::ChargePoint,
        }
    }
}

/// Registry entry for a single feature.
pub struct FeatureDescriptor {
    pub name: &'static str,
    pub profile: Profile,
    pub initiator: Initiator,
    pub(crate) decode_request: fn(Value) -> Result<Request, OcppError>,
    pub(crate) decode_response: fn(Value) -> Result<Response, OcppError>,
}

impl fmt::Debug for FeatureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureDescriptor")
            .field("name", &self.name)
            .field("profile", &self.profile)
            .field("initiator", &self.initiator)
            .finish()
    }
}

// ── Payload decoding helpers ───────────────────────────────────

fn classify_decode_error(e: serde_json::Error) -> OcppError {
    let msg = e.to_string();
    if msg.starts_with("missing field") {
        OcppError::new(ErrorCode::OccurrenceConstraintViolation, msg)
    } else {
        OcppError::new(ErrorCode::TypeConstraintViolation, msg)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, OcppError> {
    serde_json::from_value(payload).map_err(classify_decode_error)
}

/// Decode plus constraint validation, for the in-crate message types that
/// carry `validator` length/range rules.
pub(crate) fn decode_checked<T: DeserializeOwned + Validate>(
    payload: Value,
) -> Result<T, OcppError> {
    let value: T = decode(payload)?;
    value
        .validate()
        .map_err(|e| OcppError::new(ErrorCode::PropertyConstraintViolation, e.to_string()))?;
    Ok(value)
}

// ── FeatureRegistry ────────────────────────────────────────────

/// Name → feature lookup for the profiles an endpoint has enabled.
///
/// Built once at endpoint construction; not mutated afterwards.
pub struct FeatureRegistry {
    features: HashMap<&'static str, FeatureDescriptor>,
    profiles: Vec<Profile>,
}

impl FeatureRegistry {
    /// Registry over every profile.
    pub fn new() -> Self {
        Self::with_profiles(&Profile::ALL)
    }

    /// Registry over an explicit subset of profiles. Duplicates are ignored.
    pub fn with_profiles(profiles: &[Profile]) -> Self {
        let mut registry = Self {
            features: HashMap::new(),
            profiles: Vec::new(),
        };
        for &profile in profiles {
            if registry.profiles.contains(&profile) {
                continue;
            }
            registry.profiles.push(profile);
            for descriptor in profile.features() {
                let previous = registry.features.insert(descriptor.name, descriptor);
                debug_assert!(previous.is_none(), "duplicate feature name");
            }
        }
        registry
    }

    /// Look up a feature by action name.
    pub fn feature(&self, name: &str) -> Option<&FeatureDescriptor> {
        self.features.get(name)
    }

    /// Whether `profile` is enabled on this registry.
    pub fn has_profile(&self, profile: Profile) -> bool {
        self.profiles.contains(&profile)
    }

    /// The enabled profiles, in registration order.
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Decode an inbound CALL payload into a typed request.
    ///
    /// Unknown actions yield `NotImplemented`; schema violations yield the
    /// constraint-violation code reported by the decoder.
    pub fn decode_request(&self, action: &str, payload: Value) -> Result<Request, OcppError> {
        let descriptor = self
            .feature(action)
            .ok_or_else(|| OcppError::not_implemented(action))?;
        (descriptor.decode_request)(payload)
    }

    /// Decode a CALLRESULT payload for the given action into a typed
    /// response.
    pub fn decode_response(&self, action: &str, payload: Value) -> Result<Response, OcppError> {
        let descriptor = self
            .feature(action)
            .ok_or_else(|| OcppError::not_implemented(action))?;
        (descriptor.decode_response)(payload)
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_registry_covers_action_matrix() {
        let registry = FeatureRegistry::new();
        // 25 CS→CP actions + 13 CP→CS actions + DataTransfer (both).
        let cs_to_cp = [
            "ChangeAvailability",
            "ChangeConfiguration",
            "ClearCache",
            "GetConfiguration",
            "RemoteStartTransaction",
            "RemoteStopTransaction",
            "Reset",
            "UnlockConnector",
            "GetLocalListVersion",
            "SendLocalList",
            "GetDiagnostics",
            "UpdateFirmware",
            "ReserveNow",
            "CancelReservation",
            "TriggerMessage",
            "SetChargingProfile",
            "ClearChargingProfile",
            "GetCompositeSchedule",
            "ExtendedTriggerMessage",
            "CertificateSigned",
            "SignedUpdateFirmware",
            "GetLog",
            "GetInstalledCertificateIds",
            "InstallCertificate",
            "DeleteCertificate",
        ];
        let cp_to_cs = [
            "BootNotification",
            "Authorize",
            "Heartbeat",
            "MeterValues",
            "StartTransaction",
            "StopTransaction",
            "StatusNotification",
            "DiagnosticsStatusNotification",
            "FirmwareStatusNotification",
            "SignCertificate",
            "SecurityEventNotification",
            "LogStatusNotification",
            "SignedFirmwareStatusNotification",
        ];
        for action in cs_to_cp {
            let descriptor = registry.feature(action).unwrap_or_else(|| panic!("{action}"));
            assert_eq!(descriptor.initiator, Initiator::CentralSystem, "{action}");
        }
        for action in cp_to_cs {
            let descriptor = registry.feature(action).unwrap_or_else(|| panic!("{action}"));
            assert_eq!(descriptor.initiator, Initiator::ChargePoint, "{action}");
        }
        let dt = registry.feature("DataTransfer").unwrap();
        assert_eq!(dt.initiator, Initiator::Any);
        assert!(dt.initiator.allows(Role::CentralSystem));
        assert!(dt.initiator.allows(Role::ChargePoint));
    }

    #[test]
    fn profile_subset_excludes_other_features() {
        let registry = FeatureRegistry::with_profiles(&[Profile::Core]);
        assert!(registry.feature("Reset").is_some());
        assert!(registry.feature("GetLocalListVersion").is_none());
        assert!(registry.has_profile(Profile::Core));
        assert!(!registry.has_profile(Profile::LocalAuth));
    }

    #[test]
    fn duplicate_profiles_ignored() {
        let registry = FeatureRegistry::with_profiles(&[Profile::Core, Profile::Core]);
        assert_eq!(registry.profiles(), &[Profile::Core]);
    }

    #[test]
    fn unknown_action_decodes_to_not_implemented() {
        let registry = FeatureRegistry::new();
        let err = registry
            .decode_request("MadeUpAction", serde_json::json!({}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotImplemented);
        assert!(err.description.contains("MadeUpAction"));
    }

    #[test]
    fn missing_field_is_occurrence_violation() {
        let registry = FeatureRegistry::new();
        // BootNotification requires chargePointVendor + chargePointModel.
        let err = registry
            .decode_request("BootNotification", serde_json::json!({}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OccurrenceConstraintViolation);
    }

    #[test]
    fn wrong_type_is_type_violation() {
        let registry = FeatureRegistry::new();
        let err = registry
            .decode_request(
                "BootNotification",
                serde_json::json!({"chargePointVendor": 1, "chargePointModel": "M"}),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TypeConstraintViolation);
    }

    #[test]
    fn constraint_violation_from_extension_payload() {
        let registry = FeatureRegistry::new();
        let err = registry
            .decode_request(
                "SignCertificate",
                serde_json::json!({"csr": "x".repeat(6000)}),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PropertyConstraintViolation);
    }

    #[test]
    fn decode_request_produces_typed_variant() {
        let registry = FeatureRegistry::new();
        let request = registry
            .decode_request(
                "BootNotification",
                serde_json::json!({"chargePointVendor": "V", "chargePointModel": "M"}),
            )
            .unwrap();
        match request {
            Request::BootNotification(payload) => {
                assert_eq!(payload.charge_point_vendor, "V");
                assert_eq!(payload.charge_point_model, "M");
            }
            other => panic!("unexpected variant: {:?}", other.action()),
        }
    }

    #[test]
    fn decode_response_by_action() {
        let registry = FeatureRegistry::new();
        let response = registry
            .decode_response("Heartbeat", serde_json::json!({"currentTime": "2024-01-01T00:00:00Z"}))
            .unwrap();
        assert_eq!(response.action(), "Heartbeat");
    }
}
