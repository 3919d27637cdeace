//! SecurityEventNotification (CP → CS).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEventNotificationRequest {
    /// Security event type, e.g. `"SettingSystemTime"`.
    #[serde(rename = "type")]
    #[validate(length(max = 50))]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    #[validate(length(max = 255))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_info: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityEventNotificationResponse {}
