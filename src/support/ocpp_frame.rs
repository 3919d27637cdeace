//! OCPP-J message framing
//!
//! Implements the OCPP-J (JSON over WebSocket) transport framing:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! Payloads stay opaque (`serde_json::Value`) at this layer; typed decoding
//! happens in the feature registry once the action is known.

use serde_json::Value;
use thiserror::Error;

use super::errors::ErrorCode;

// ── Message-type constants ─────────────────────────────────────

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

/// Maximum length of a uniqueId field, per OCPP-J.
const MAX_UNIQUE_ID_LEN: usize = 36;

// ── OcppFrame ──────────────────────────────────────────────────

/// A parsed OCPP-J frame.
#[derive(Debug, Clone)]
pub enum OcppFrame {
    /// `[2, uniqueId, action, payload]`
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    /// `[3, uniqueId, payload]`
    CallResult {
        unique_id: String,
        payload: Value,
    },
    /// `[4, uniqueId, errorCode, errorDescription, errorDetails]`
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

impl OcppFrame {
    // ── Parsing ────────────────────────────────────────────

    /// Parse a raw JSON text frame into an `OcppFrame`.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let arr: Vec<Value> =
            serde_json::from_str(text).map_err(|e| FrameError::InvalidJson(e.to_string()))?;

        if arr.is_empty() {
            return Err(FrameError::EmptyArray);
        }

        let msg_type = arr[0].as_u64().ok_or(FrameError::InvalidMessageType)?;

        match msg_type {
            MSG_TYPE_CALL => Self::parse_call(&arr),
            MSG_TYPE_CALL_RESULT => Self::parse_call_result(&arr),
            MSG_TYPE_CALL_ERROR => Self::parse_call_error(&arr),
            _ => Err(FrameError::UnknownMessageType(msg_type)),
        }
    }

    fn parse_unique_id(arr: &[Value]) -> Result<String, FrameError> {
        let unique_id = arr[1]
            .as_str()
            .ok_or(FrameError::FieldTypeMismatch("uniqueId must be a string"))?;
        if unique_id.is_empty() || unique_id.len() > MAX_UNIQUE_ID_LEN {
            return Err(FrameError::InvalidUniqueId(unique_id.len()));
        }
        Ok(unique_id.to_string())
    }

    fn parse_call(arr: &[Value]) -> Result<Self, FrameError> {
        if arr.len() < 4 {
            return Err(FrameError::MissingFields {
                expected: 4,
                got: arr.len(),
            });
        }

        let unique_id = Self::parse_unique_id(arr)?;
        let action = arr[2]
            .as_str()
            .ok_or(FrameError::FieldTypeMismatch("action must be a string"))?
            .to_string();
        let payload = arr[3].clone();

        Ok(Self::Call {
            unique_id,
            action,
            payload,
        })
    }

    fn parse_call_result(arr: &[Value]) -> Result<Self, FrameError> {
        if arr.len() < 3 {
            return Err(FrameError::MissingFields {
                expected: 3,
                got: arr.len(),
            });
        }

        let unique_id = Self::parse_unique_id(arr)?;
        let payload = arr.get(2).cloned().unwrap_or(Value::Object(Default::default()));

        Ok(Self::CallResult { unique_id, payload })
    }

    fn parse_call_error(arr: &[Value]) -> Result<Self, FrameError> {
        if arr.len() < 4 {
            return Err(FrameError::MissingFields {
                expected: 4,
                got: arr.len(),
            });
        }

        let unique_id = Self::parse_unique_id(arr)?;
        let error_code = arr[2].as_str().unwrap_or("GenericError").to_string();
        let error_description = arr
            .get(3)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let error_details = arr
            .get(4)
            .cloned()
            .unwrap_or(Value::Object(Default::default()));

        Ok(Self::CallError {
            unique_id,
            error_code,
            error_description,
            error_details,
        })
    }

    /// Best-effort extraction of the uniqueId from a frame that failed to
    /// parse, so a CALLERROR can still be correlated by the peer.
    pub fn salvage_unique_id(text: &str) -> Option<String> {
        let arr: Vec<Value> = serde_json::from_str(text).ok()?;
        let id = arr.get(1)?.as_str()?;
        if id.is_empty() || id.len() > MAX_UNIQUE_ID_LEN {
            return None;
        }
        Some(id.to_string())
    }

    // ── Serialization ──────────────────────────────────────

    /// Serialize this frame to a JSON text frame.
    pub fn serialize(&self) -> String {
        let arr: Value = match self {
            Self::Call {
                unique_id,
                action,
                payload,
            } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL.into()),
                Value::String(unique_id.clone()),
                Value::String(action.clone()),
                payload.clone(),
            ]),

            Self::CallResult { unique_id, payload } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL_RESULT.into()),
                Value::String(unique_id.clone()),
                payload.clone(),
            ]),

            Self::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL_ERROR.into()),
                Value::String(unique_id.clone()),
                Value::String(error_code.clone()),
                Value::String(error_description.clone()),
                error_details.clone(),
            ]),
        };

        // serde_json::to_string on a Value never fails
        serde_json::to_string(&arr).unwrap()
    }

    // ── Helpers ────────────────────────────────────────────

    /// Get the unique message ID.
    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call { unique_id, .. }
            | Self::CallResult { unique_id, .. }
            | Self::CallError { unique_id, .. } => unique_id,
        }
    }

    /// Returns `true` if this is a `Call` frame.
    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }

    /// Returns `true` if this is a `CallResult` frame.
    pub fn is_call_result(&self) -> bool {
        matches!(self, Self::CallResult { .. })
    }

    /// Returns `true` if this is a `CallError` frame.
    pub fn is_call_error(&self) -> bool {
        matches!(self, Self::CallError { .. })
    }
}

// ── Errors ─────────────────────────────────────────────────────

/// Errors that can occur when parsing an OCPP-J frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("empty OCPP message array")]
    EmptyArray,
    #[error("message type is not a number")]
    InvalidMessageType,
    #[error("unknown message type: {0}")]
    UnknownMessageType(u64),
    #[error("expected at least {expected} fields, got {got}")]
    MissingFields { expected: usize, got: usize },
    #[error("field type mismatch: {0}")]
    FieldTypeMismatch(&'static str),
    #[error("uniqueId must be 1..=36 characters, got {0}")]
    InvalidUniqueId(usize),
}

impl FrameError {
    /// The OCPP error code a peer should receive for this parse failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownMessageType(_) => ErrorCode::FormationViolation,
            _ => ErrorCode::ProtocolError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_call() {
        let text = r#"[2,"abc123","BootNotification",{"chargePointVendor":"Vendor","chargePointModel":"Model"}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => {
                assert_eq!(unique_id, "abc123");
                assert_eq!(action, "BootNotification");
                assert_eq!(payload["chargePointVendor"], "Vendor");
            }
            _ => panic!("Expected Call frame"),
        }
    }

    #[test]
    fn parse_call_result() {
        let text = r#"[3,"abc123",{"status":"Accepted","currentTime":"2024-01-01T00:00:00Z","interval":300}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::CallResult { unique_id, payload } => {
                assert_eq!(unique_id, "abc123");
                assert_eq!(payload["status"], "Accepted");
            }
            _ => panic!("Expected CallResult frame"),
        }
    }

    #[test]
    fn parse_call_error() {
        let text = r#"[4,"abc123","NotImplemented","Action not supported",{}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                assert_eq!(unique_id, "abc123");
                assert_eq!(error_code, "NotImplemented");
                assert_eq!(error_description, "Action not supported");
            }
            _ => panic!("Expected CallError frame"),
        }
    }

    #[test]
    fn roundtrip_call() {
        let frame = OcppFrame::Call {
            unique_id: "id1".into(),
            action: "Heartbeat".into(),
            payload: serde_json::json!({}),
        };
        let json = frame.serialize();
        let parsed = OcppFrame::parse(&json).unwrap();
        assert!(parsed.is_call());
        assert_eq!(parsed.unique_id(), "id1");
    }

    #[test]
    fn roundtrip_call_error() {
        let frame = OcppFrame::CallError {
            unique_id: "id3".into(),
            error_code: "GenericError".into(),
            error_description: "Something went wrong".into(),
            error_details: serde_json::json!({}),
        };
        let json = frame.serialize();
        let parsed = OcppFrame::parse(&json).unwrap();
        assert!(parsed.is_call_error());
        assert_eq!(parsed.unique_id(), "id3");
    }

    #[test]
    fn rejects_empty_unique_id() {
        let err = OcppFrame::parse(r#"[2,"","Heartbeat",{}]"#).unwrap_err();
        assert!(matches!(err, FrameError::InvalidUniqueId(0)));
        assert_eq!(err.error_code(), ErrorCode::ProtocolError);
    }

    #[test]
    fn rejects_oversized_unique_id() {
        let id = "x".repeat(37);
        let text = format!(r#"[2,"{}","Heartbeat",{{}}]"#, id);
        let err = OcppFrame::parse(&text).unwrap_err();
        assert!(matches!(err, FrameError::InvalidUniqueId(37)));
    }

    #[test]
    fn unknown_message_type_is_formation_violation() {
        let err = OcppFrame::parse(r#"[5,"abc","Heartbeat",{}]"#).unwrap_err();
        assert!(matches!(err, FrameError::UnknownMessageType(5)));
        assert_eq!(err.error_code(), ErrorCode::FormationViolation);
    }

    #[test]
    fn invalid_outer_shape_is_protocol_error() {
        for text in [r#"{"not":"an array"}"#, "[]", r#"["2","abc"]"#, "[2]"] {
            let err = OcppFrame::parse(text).unwrap_err();
            assert_eq!(err.error_code(), ErrorCode::ProtocolError, "input: {}", text);
        }
    }

    #[test]
    fn salvage_unique_id_from_broken_frame() {
        assert_eq!(
            OcppFrame::salvage_unique_id(r#"[2,"abc123"]"#).as_deref(),
            Some("abc123")
        );
        assert_eq!(OcppFrame::salvage_unique_id(r#"[2,17,"X",{}]"#), None);
        assert_eq!(OcppFrame::salvage_unique_id("garbage"), None);
    }
}
