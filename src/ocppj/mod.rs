//! OCPP-J endpoint layer.
//!
//! Wraps a transport into a typed request/response protocol: request id
//! generation, per-peer call serialization ([`callback_queue`]), response
//! correlation, inbound dispatch and the asynchronous errors channel.
//! [`Server`] is the multi-peer (central-system) endpoint, [`Client`] the
//! single-peer (charge-point) endpoint.

pub mod callback_queue;
mod client;
mod server;

use std::time::Duration;

pub use callback_queue::{CallCallback, CallOutcome, QueueError};
pub use client::Client;
pub use server::Server;

use crate::feature::Response;
use crate::support::errors::{ErrorCode, OcppError};

/// Capacity of the errors channel. Producers drop on overflow; the channel
/// is best-effort observability, never backpressure.
pub(crate) const ERROR_CHANNEL_CAPACITY: usize = 1;

/// Result of a profile handler invocation.
///
/// `Ok(None)` means the handler produced no confirmation where one was
/// required; the endpoint replies with a `GenericError` and reports the
/// empty confirmation on the errors channel.
pub type HandlerResult<T> = Result<Option<T>, OcppError>;

/// Error for a CALLRESULT whose variant does not match the request that is
/// being confirmed.
pub(crate) fn unexpected_response(action: &str, response: &Response) -> OcppError {
    OcppError::internal(format!(
        "unexpected response type {} to {} request",
        response.action(),
        action
    ))
}

/// Internal cancellation of an in-flight CALL.
///
/// Never serialized to the wire: synthesized by timeouts and shutdown, and
/// routed through the same terminal path as a received CALLERROR, so the
/// per-peer queue advances.
#[derive(Debug, Clone)]
pub struct CallCancellation {
    pub unique_id: String,
    pub reason: ErrorCode,
    pub description: String,
}

impl CallCancellation {
    /// Cancellation for a call that exceeded the configured timeout.
    pub fn timed_out(unique_id: String, timeout: Duration) -> Self {
        Self {
            unique_id,
            reason: ErrorCode::GenericError,
            description: format!(
                "call timed out after {}s, no response received",
                timeout.as_secs_f64()
            ),
        }
    }

    /// The error delivered to the call's callback.
    pub fn into_error(self) -> OcppError {
        OcppError::new(self.reason, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_maps_to_generic_error() {
        let cancellation = CallCancellation::timed_out("17".into(), Duration::from_secs(30));
        assert_eq!(cancellation.unique_id, "17");
        let err = cancellation.into_error();
        assert_eq!(err.code, ErrorCode::GenericError);
        assert!(err.description.contains("timed out after 30s"));
    }
}
