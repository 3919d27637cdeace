//! ExtendedTriggerMessage (CS → CP): TriggerMessage extended with the
//! security-whitepaper message kinds.

use serde::{Deserialize, Serialize};

use super::types::{ExtendedTriggerMessageStatus, MessageTriggerExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedTriggerMessageRequest {
    pub requested_message: MessageTriggerExt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedTriggerMessageResponse {
    pub status: ExtendedTriggerMessageStatus,
}
