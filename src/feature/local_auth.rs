//! LocalAuthListManagement profile.

use super::{decode, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const GET_LOCAL_LIST_VERSION: &str = "GetLocalListVersion";
pub const SEND_LOCAL_LIST: &str = "SendLocalList";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            name: GET_LOCAL_LIST_VERSION,
            profile: Profile::LocalAuth,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::GetLocalListVersion(decode(p)?)),
            decode_response: |p| Ok(Response::GetLocalListVersion(decode(p)?)),
        },
        FeatureDescriptor {
            name: SEND_LOCAL_LIST,
            profile: Profile::LocalAuth,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::SendLocalList(decode(p)?)),
            decode_response: |p| Ok(Response::SendLocalList(decode(p)?)),
        },
    ]
}
