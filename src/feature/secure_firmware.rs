//! SecureFirmwareUpdate profile (OCPP 1.6 security whitepaper).

use super::{decode, decode_checked, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const SIGNED_FIRMWARE_STATUS_NOTIFICATION: &str = "SignedFirmwareStatusNotification";
pub const SIGNED_UPDATE_FIRMWARE: &str = "SignedUpdateFirmware";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            name: SIGNED_FIRMWARE_STATUS_NOTIFICATION,
            profile: Profile::SecureFirmware,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::SignedFirmwareStatusNotification(decode(p)?)),
            decode_response: |p| Ok(Response::SignedFirmwareStatusNotification(decode(p)?)),
        },
        FeatureDescriptor {
            name: SIGNED_UPDATE_FIRMWARE,
            profile: Profile::SecureFirmware,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::SignedUpdateFirmware(decode_checked(p)?)),
            decode_response: |p| Ok(Response::SignedUpdateFirmware(decode(p)?)),
        },
    ]
}
