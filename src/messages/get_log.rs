//! GetLog (CS → CP): requests upload of a diagnostics or security log.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::types::{LogParameters, LogStatus, LogType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetLogRequest {
    #[validate(nested)]
    pub log: LogParameters,
    pub log_type: LogType,
    pub request_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetLogResponse {
    pub status: LogStatus,
    /// Name the charge point will use for the uploaded file.
    #[validate(length(max = 255))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}
