//! SignedFirmwareStatusNotification (CP → CS).

use serde::{Deserialize, Serialize};

use super::types::SignedFirmwareStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedFirmwareStatusNotificationRequest {
    pub status: SignedFirmwareStatus,
    /// Id of the SignedUpdateFirmware request this notification refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedFirmwareStatusNotificationResponse {}
