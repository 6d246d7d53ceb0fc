//! Core type definitions for AppBridge.
//!
//! This crate defines the values that cross the boundary between an
//! orchestrating caller and a sandboxed app component:
//! - The caller's [`Identity`] (opaque to the bridge)
//! - Per-call [`TriggerContext`] and [`ActionContext`] snapshots
//! - Component responses ([`TriggerResponse`], [`ActionResponse`])
//! - The stable [`ErrorCode`] vocabulary and the raw [`ComponentFault`]
//!
//! Nothing here performs I/O. The bridge itself lives in `appbridge-host`.

mod capability;
mod context;
mod error_code;
mod identity;
mod response;

pub use capability::{CapabilityKind, SchemaKind};
pub use context::{ActionContext, EMPTY_INPUT, TriggerContext};
pub use error_code::{ComponentFault, ErrorCode};
pub use identity::Identity;
pub use response::{ActionResponse, TriggerEvent, TriggerResponse};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors raised while constructing identities and contexts.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
