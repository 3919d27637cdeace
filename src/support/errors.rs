//! Protocol and endpoint error types.
//!
//! `OcppError` maps 1:1 onto an OCPP-J CALLERROR frame and is the error type
//! carried by every call callback. `EndpointError` is the type delivered on
//! an endpoint's asynchronous errors channel.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Canonical OCPP-J error codes.
///
/// The wire representation is the exact variant name (`"NotImplemented"`,
/// `"PropertyConstraintViolation"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Requested action is not known by the receiver.
    NotImplemented,
    /// Requested action is recognized but not supported by the receiver.
    NotSupported,
    /// An internal error occurred and the receiver was not able to process
    /// the requested action successfully.
    InternalError,
    /// Payload for the action is incomplete.
    ProtocolError,
    /// During the processing of the action a security issue occurred.
    SecurityError,
    /// Payload for the action is syntactically incorrect or not conform to
    /// the PDU structure of the action.
    FormationViolation,
    /// Payload is syntactically correct but at least one field contains an
    /// invalid value.
    PropertyConstraintViolation,
    /// Payload for the action is syntactically correct but at least one of
    /// the fields violates occurrence constraints.
    OccurrenceConstraintViolation,
    /// Payload for the action is syntactically correct but at least one of
    /// the fields violates data type constraints.
    TypeConstraintViolation,
    /// Any other error not covered by the previous ones.
    GenericError,
    /// Payload for the action is syntactically incorrect.
    FormatViolation,
}

impl ErrorCode {
    /// The canonical wire string for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotImplemented => "NotImplemented",
            Self::NotSupported => "NotSupported",
            Self::InternalError => "InternalError",
            Self::ProtocolError => "ProtocolError",
            Self::SecurityError => "SecurityError",
            Self::FormationViolation => "FormationViolation",
            Self::PropertyConstraintViolation => "PropertyConstraintViolation",
            Self::OccurrenceConstraintViolation => "OccurrenceConstraintViolation",
            Self::TypeConstraintViolation => "TypeConstraintViolation",
            Self::GenericError => "GenericError",
            Self::FormatViolation => "FormatViolation",
        }
    }

    /// Parse a wire error-code string. Unknown codes map to `GenericError`
    /// so a peer speaking a newer dialect cannot break correlation.
    pub fn from_wire(code: &str) -> Self {
        match code {
            "NotImplemented" => Self::NotImplemented,
            "NotSupported" => Self::NotSupported,
            "InternalError" => Self::InternalError,
            "ProtocolError" => Self::ProtocolError,
            "SecurityError" => Self::SecurityError,
            "FormationViolation" => Self::FormationViolation,
            "PropertyConstraintViolation" => Self::PropertyConstraintViolation,
            "OccurrenceConstraintViolation" => Self::OccurrenceConstraintViolation,
            "TypeConstraintViolation" => Self::TypeConstraintViolation,
            "GenericError" => Self::GenericError,
            "FormatViolation" => Self::FormatViolation,
            _ => Self::GenericError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol-level OCPP error.
///
/// Outbound, it becomes a CALLERROR frame; inbound, it is what a call
/// callback receives when the peer answered with a CALLERROR (or when the
/// call was cancelled locally).
#[derive(Debug, Clone, Error)]
#[error("{code}: {description}")]
pub struct OcppError {
    pub code: ErrorCode,
    pub description: String,
    pub details: Value,
}

impl OcppError {
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            details: Value::Object(Default::default()),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn internal(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, description)
    }

    pub fn generic(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::GenericError, description)
    }

    /// Error used when an action is not registered on the receiving endpoint.
    pub fn not_implemented(action: &str) -> Self {
        Self::new(
            ErrorCode::NotImplemented,
            format!("no handler for action {} implemented", action),
        )
    }

    /// Error used to cancel outstanding calls when the peer goes away.
    pub fn client_disconnected() -> Self {
        Self::new(
            ErrorCode::GenericError,
            "client disconnected, no response received from client",
        )
    }
}

/// Non-recoverable asynchronous endpoint errors, surfaced on the bounded
/// errors channel. These are observability events: the endpoint keeps
/// running after every one of them.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// A CALLRESULT or CALLERROR arrived with no matching pending call.
    #[error("no handler available for call of type {kind} from client {peer_id} for request {request_id}")]
    OrphanResponse {
        peer_id: String,
        kind: &'static str,
        request_id: String,
    },

    /// A handler completed without producing a confirmation where one was
    /// contractually required.
    #[error("empty confirmation to {peer_id} for request {request_id}")]
    EmptyConfirmation {
        peer_id: String,
        request_id: String,
    },

    /// Sending a reply failed, and the fallback error reply failed too.
    #[error("error replying {peer_id} to request {request_id}: {reason}")]
    ReplyFailed {
        peer_id: String,
        request_id: String,
        reason: String,
    },
}
