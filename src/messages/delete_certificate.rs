//! DeleteCertificate (CS → CP): removes an installed certificate.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::types::{CertificateHashData, DeleteCertificateStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCertificateRequest {
    #[validate(nested)]
    pub certificate_hash_data: CertificateHashData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCertificateResponse {
    pub status: DeleteCertificateStatus,
}
