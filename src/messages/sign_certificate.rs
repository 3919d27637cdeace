//! SignCertificate (CP → CS): submits a CSR for signing.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::types::GenericStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignCertificateRequest {
    /// PEM-encoded certificate signing request.
    #[validate(length(max = 5500))]
    pub csr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignCertificateResponse {
    pub status: GenericStatus,
}
