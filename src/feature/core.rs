//! Core profile: the sixteen mandatory OCPP 1.6 features.

use super::{decode, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const AUTHORIZE: &str = "Authorize";
pub const BOOT_NOTIFICATION: &str = "BootNotification";
pub const CHANGE_AVAILABILITY: &str = "ChangeAvailability";
pub const CHANGE_CONFIGURATION: &str = "ChangeConfiguration";
pub const CLEAR_CACHE: &str = "ClearCache";
pub const DATA_TRANSFER: &str = "DataTransfer";
pub const GET_CONFIGURATION: &str = "GetConfiguration";
pub const HEARTBEAT: &str = "Heartbeat";
pub const METER_VALUES: &str = "MeterValues";
pub const REMOTE_START_TRANSACTION: &str = "RemoteStartTransaction";
pub const REMOTE_STOP_TRANSACTION: &str = "RemoteStopTransaction";
pub const RESET: &str = "Reset";
pub const START_TRANSACTION: &str = "StartTransaction";
pub const STATUS_NOTIFICATION: &str = "StatusNotification";
pub const STOP_TRANSACTION: &str = "StopTransaction";
pub const UNLOCK_CONNECTOR: &str = "UnlockConnector";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            name: AUTHORIZE,
            profile: Profile::Core,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::Authorize(decode(p)?)),
            decode_response: |p| Ok(Response::Authorize(decode(p)?)),
        },
        FeatureDescriptor {
            name: BOOT_NOTIFICATION,
            profile: Profile::Core,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::BootNotification(decode(p)?)),
            decode_response: |p| Ok(Response::BootNotification(decode(p)?)),
        },
        FeatureDescriptor {
            name: CHANGE_AVAILABILITY,
            profile: Profile::Core,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::ChangeAvailability(decode(p)?)),
            decode_response: |p| Ok(Response::ChangeAvailability(decode(p)?)),
        },
        FeatureDescriptor {
            name: CHANGE_CONFIGURATION,
            profile: Profile::Core,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::ChangeConfiguration(decode(p)?)),
            decode_response: |p| Ok(Response::ChangeConfiguration(decode(p)?)),
        },
        FeatureDescriptor {
            name: CLEAR_CACHE,
            profile: Profile::Core,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::ClearCache(decode(p)?)),
            decode_response: |p| Ok(Response::ClearCache(decode(p)?)),
        },
        FeatureDescriptor {
            name: DATA_TRANSFER,
            profile: Profile::Core,
            initiator: Initiator::Any,
            decode_request: |p| Ok(Request::DataTransfer(decode(p)?)),
            decode_response: |p| Ok(Response::DataTransfer(decode(p)?)),
        },
        FeatureDescriptor {
            name: GET_CONFIGURATION,
            profile: Profile::Core,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::GetConfiguration(decode(p)?)),
            decode_response: |p| Ok(Response::GetConfiguration(decode(p)?)),
        },
        FeatureDescriptor {
            name: HEARTBEAT,
            profile: Profile::Core,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::Heartbeat(decode(p)?)),
            decode_response: |p| Ok(Response::Heartbeat(decode(p)?)),
        },
        FeatureDescriptor {
            name: METER_VALUES,
            profile: Profile::Core,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::MeterValues(decode(p)?)),
            decode_response: |p| Ok(Response::MeterValues(decode(p)?)),
        },
        FeatureDescriptor {
            name: REMOTE_START_TRANSACTION,
            profile: Profile::Core,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::RemoteStartTransaction(decode(p)?)),
            decode_response: |p| Ok(Response::RemoteStartTransaction(decode(p)?)),
        },
        FeatureDescriptor {
            name: REMOTE_STOP_TRANSACTION,
            profile: Profile::Core,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::RemoteStopTransaction(decode(p)?)),
            decode_response: |p| Ok(Response::RemoteStopTransaction(decode(p)?)),
        },
        FeatureDescriptor {
            name: RESET,
            profile: Profile::Core,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::Reset(decode(p)?)),
            decode_response: |p| Ok(Response::Reset(decode(p)?)),
        },
        FeatureDescriptor {
            name: START_TRANSACTION,
            profile: Profile::Core,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::StartTransaction(decode(p)?)),
            decode_response: |p| Ok(Response::StartTransaction(decode(p)?)),
        },
        FeatureDescriptor {
            name: STATUS_NOTIFICATION,
            profile: Profile::Core,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::StatusNotification(decode(p)?)),
            decode_response: |p| Ok(Response::StatusNotification(decode(p)?)),
        },
        FeatureDescriptor {
            name: STOP_TRANSACTION,
            profile: Profile::Core,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::StopTransaction(decode(p)?)),
            decode_response: |p| Ok(Response::StopTransaction(decode(p)?)),
        },
        FeatureDescriptor {
            name: UNLOCK_CONNECTOR,
            profile: Profile::Core,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::UnlockConnector(decode(p)?)),
            decode_response: |p| Ok(Response::UnlockConnector(decode(p)?)),
        },
    ]
}
