//! Logging profile (OCPP 1.6 security whitepaper).

use super::{decode, decode_checked, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const GET_LOG: &str = "GetLog";
pub const LOG_STATUS_NOTIFICATION: &str = "LogStatusNotification";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            name: GET_LOG,
            profile: Profile::Logging,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::GetLog(decode_checked(p)?)),
            decode_response: |p| Ok(Response::GetLog(decode_checked(p)?)),
        },
        FeatureDescriptor {
            name: LOG_STATUS_NOTIFICATION,
            profile: Profile::Logging,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::LogStatusNotification(decode(p)?)),
            decode_response: |p| Ok(Response::LogStatusNotification(decode(p)?)),
        },
    ]
}
