//! FirmwareManagement profile.

use super::{decode, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const DIAGNOSTICS_STATUS_NOTIFICATION: &str = "DiagnosticsStatusNotification";
pub const FIRMWARE_STATUS_NOTIFICATION: &str = "FirmwareStatusNotification";
pub const GET_DIAGNOSTICS: &str = "GetDiagnostics";
pub const UPDATE_FIRMWARE: &str = "UpdateFirmware";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            name: DIAGNOSTICS_STATUS_NOTIFICATION,
            profile: Profile::Firmware,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::DiagnosticsStatusNotification(decode(p)?)),
            decode_response: |p| Ok(Response::DiagnosticsStatusNotification(decode(p)?)),
        },
        FeatureDescriptor {
            name: FIRMWARE_STATUS_NOTIFICATION,
            profile: Profile::Firmware,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::FirmwareStatusNotification(decode(p)?)),
            decode_response: |p| Ok(Response::FirmwareStatusNotification(decode(p)?)),
        },
        FeatureDescriptor {
            name: GET_DIAGNOSTICS,
            profile: Profile::Firmware,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::GetDiagnostics(decode(p)?)),
            decode_response: |p| Ok(Response::GetDiagnostics(decode(p)?)),
        },
        FeatureDescriptor {
            name: UPDATE_FIRMWARE,
            profile: Profile::Firmware,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::UpdateFirmware(decode(p)?)),
            decode_response: |p| Ok(Response::UpdateFirmware(decode(p)?)),
        },
    ]
}
