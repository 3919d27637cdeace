//! Certificates profile (OCPP 1.6 security whitepaper).

use super::{decode, decode_checked, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const DELETE_CERTIFICATE: &str = "DeleteCertificate";
pub const GET_INSTALLED_CERTIFICATE_IDS: &str = "GetInstalledCertificateIds";
pub const INSTALL_CERTIFICATE: &str = "InstallCertificate";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            name: DELETE_CERTIFICATE,
            profile: Profile::Certificates,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::DeleteCertificate(decode_checked(p)?)),
            decode_response: |p| Ok(Response::DeleteCertificate(decode(p)?)),
        },
        FeatureDescriptor {
            name: GET_INSTALLED_CERTIFICATE_IDS,
            profile: Profile::Certificates,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::GetInstalledCertificateIds(decode(p)?)),
            decode_response: |p| Ok(Response::GetInstalledCertificateIds(decode(p)?)),
        },
        FeatureDescriptor {
            name: INSTALL_CERTIFICATE,
            profile: Profile::Certificates,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::InstallCertificate(decode_checked(p)?)),
            decode_response: |p| Ok(Response::InstallCertificate(decode(p)?)),
        },
    ]
}
