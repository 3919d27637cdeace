//! ExtendedTriggerMessage profile (OCPP 1.6 security whitepaper).

use super::{decode, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const EXTENDED_TRIGGER_MESSAGE: &str = "ExtendedTriggerMessage";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![FeatureDescriptor {
        name: EXTENDED_TRIGGER_MESSAGE,
        profile: Profile::ExtendedTriggerMessage,
        initiator: Initiator::CentralSystem,
        decode_request: |p| Ok(Request::ExtendedTriggerMessage(decode(p)?)),
        decode_response: |p| Ok(Response::ExtendedTriggerMessage(decode(p)?)),
    }]
}
