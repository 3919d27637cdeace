//! Reservation profile.

use super::{decode, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const CANCEL_RESERVATION: &str = "CancelReservation";
pub const RESERVE_NOW: &str = "ReserveNow";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            name: CANCEL_RESERVATION,
            profile: Profile::Reservation,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::CancelReservation(decode(p)?)),
            decode_response: |p| Ok(Response::CancelReservation(decode(p)?)),
        },
        FeatureDescriptor {
            name: RESERVE_NOW,
            profile: Profile::Reservation,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::ReserveNow(decode(p)?)),
            decode_response: |p| Ok(Response::ReserveNow(decode(p)?)),
        },
    ]
}
