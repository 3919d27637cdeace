//! RemoteTrigger profile.

use super::{decode, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const TRIGGER_MESSAGE: &str = "TriggerMessage";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![FeatureDescriptor {
        name: TRIGGER_MESSAGE,
        profile: Profile::RemoteTrigger,
        initiator: Initiator::CentralSystem,
        decode_request: |p| Ok(Request::TriggerMessage(decode(p)?)),
        decode_response: |p| Ok(Response::TriggerMessage(decode(p)?)),
    }]
}
