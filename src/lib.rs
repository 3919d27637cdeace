//! # Voltara OCPP
//!
//! OCPP 1.6 endpoint runtime for EV charging infrastructure: the OCPP-J
//! message layer (CALL/CALLRESULT/CALLERROR framing and correlation),
//! per-peer call queueing with FIFO callback dispatch, feature-profile
//! routing, and typed [`CentralSystem`] / [`ChargePoint`] facades.
//!
//! ## Architecture
//!
//! - **support**: cross-cutting utilities (errors, OCPP-J framing, shutdown)
//! - **messages**: security-extension payloads missing from `rust_ocpp::v1_6`
//! - **feature**: profile definitions, feature registry, typed message unions
//! - **ocppj**: endpoint layer (pending-call queue, correlation, dispatch)
//! - **transport**: framed transport contract + WebSocket implementation
//! - **central_system** / **charge_point**: one typed method per OCPP action
//! - **config**: TOML-based endpoint configuration
//!
//! Payload types for the 28 standard OCPP 1.6 messages come from the
//! `rust_ocpp` crate and are re-exported by the shells' method signatures.

pub mod central_system;
pub mod charge_point;
pub mod config;
pub mod feature;
pub mod messages;
pub mod ocppj;
pub mod support;
pub mod transport;

// Re-export commonly used types at crate root
pub use central_system::{CentralSystem, CentralSystemBuilder};
pub use charge_point::{ChargePoint, ChargePointBuilder};
pub use config::{default_config_dir, CentralSystemConfig, ChargePointConfig};
pub use feature::{FeatureRegistry, Initiator, Profile, Request, Response, Role};
pub use ocppj::{CallCallback, CallCancellation, CallOutcome, HandlerResult};
pub use support::errors::{EndpointError, ErrorCode, OcppError};
pub use support::ocpp_frame::{FrameError, OcppFrame};
pub use transport::{TransportClient, TransportError, TransportServer};
