//! SmartCharging profile.

use super::{decode, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const CLEAR_CHARGING_PROFILE: &str = "ClearChargingProfile";
pub const GET_COMPOSITE_SCHEDULE: &str = "GetCompositeSchedule";
pub const SET_CHARGING_PROFILE: &str = "SetChargingProfile";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            name: CLEAR_CHARGING_PROFILE,
            profile: Profile::SmartCharging,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::ClearChargingProfile(decode(p)?)),
            decode_response: |p| Ok(Response::ClearChargingProfile(decode(p)?)),
        },
        FeatureDescriptor {
            name: GET_COMPOSITE_SCHEDULE,
            profile: Profile::SmartCharging,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::GetCompositeSchedule(decode(p)?)),
            decode_response: |p| Ok(Response::GetCompositeSchedule(decode(p)?)),
        },
        FeatureDescriptor {
            name: SET_CHARGING_PROFILE,
            profile: Profile::SmartCharging,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::SetChargingProfile(decode(p)?)),
            decode_response: |p| Ok(Response::SetChargingProfile(decode(p)?)),
        },
    ]
}
