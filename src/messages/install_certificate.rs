//! InstallCertificate (CS → CP): installs a root certificate.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::types::{CertificateUse, InstallCertificateStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InstallCertificateRequest {
    pub certificate_type: CertificateUse,
    /// PEM-encoded X.509 certificate.
    #[validate(length(max = 5500))]
    pub certificate: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallCertificateResponse {
    pub status: InstallCertificateStatus,
}
