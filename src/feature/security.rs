//! Security profile (OCPP 1.6 security whitepaper).

use super::{decode, decode_checked, FeatureDescriptor, Initiator, Profile, Request, Response};

pub const CERTIFICATE_SIGNED: &str = "CertificateSigned";
pub const SECURITY_EVENT_NOTIFICATION: &str = "SecurityEventNotification";
pub const SIGN_CERTIFICATE: &str = "SignCertificate";

pub(crate) fn features() -> Vec<FeatureDescriptor> {
    vec![
        FeatureDescriptor {
            name: CERTIFICATE_SIGNED,
            profile: Profile::Security,
            initiator: Initiator::CentralSystem,
            decode_request: |p| Ok(Request::CertificateSigned(decode_checked(p)?)),
            decode_response: |p| Ok(Response::CertificateSigned(decode(p)?)),
        },
        FeatureDescriptor {
            name: SECURITY_EVENT_NOTIFICATION,
            profile: Profile::Security,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::SecurityEventNotification(decode_checked(p)?)),
            decode_response: |p| Ok(Response::SecurityEventNotification(decode(p)?)),
        },
        FeatureDescriptor {
            name: SIGN_CERTIFICATE,
            profile: Profile::Security,
            initiator: Initiator::ChargePoint,
            decode_request: |p| Ok(Request::SignCertificate(decode_checked(p)?)),
            decode_response: |p| Ok(Response::SignCertificate(decode(p)?)),
        },
    ]
}
