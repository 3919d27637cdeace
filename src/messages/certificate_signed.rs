//! CertificateSigned (CS → CP): delivers a signed charge-point certificate.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::types::CertificateSignedStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSignedRequest {
    /// PEM-encoded certificate chain, leaf first.
    #[validate(length(max = 10000))]
    pub certificate_chain: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSignedResponse {
    pub status: CertificateSignedStatus,
}
