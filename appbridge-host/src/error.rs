//! Error types for the bridge.

use appbridge_types::{CapabilityKind, ErrorCode, SchemaKind};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures that happen before any capability can be called.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read component {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("incompatible component version ({}): {reason}", .path.display())]
    Incompatible { path: PathBuf, reason: String },

    #[error("duplicate {kind} id '{id}' in component registry")]
    DuplicateCapability { kind: CapabilityKind, id: String },

    #[error("capability enumeration failed: {message}")]
    Enumeration { message: String },

    #[error("engine initialization failed: {0}")]
    Engine(String),
}

/// Which governed path timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Polling,
    Action,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polling => f.write_str("Polling"),
            Self::Action => f.write_str("Action"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{phase} exceeded {} seconds", .deadline.as_secs_f64())]
    Timeout {
        phase: Phase,
        capability: String,
        deadline: Duration,
    },

    #[error("Maximum {limit} events allowed (got {count})")]
    TooManyEvents { count: usize, limit: usize },

    #[error("Store size exceeds {limit} byte limit (got {size} bytes)")]
    StoreTooLarge { size: usize, limit: usize },

    #[error("Action response size exceeds {limit} byte limit (got {size} bytes)")]
    ActionResponseTooLarge { size: usize, limit: usize },

    #[error("{kind} schema not found: no capability '{id}'")]
    SchemaNotFound { kind: SchemaKind, id: String },

    #[error("{code}: {message}")]
    Component { code: ErrorCode, message: String },

    #[error("resource limit exceeded: {detail}")]
    ResourceLimitExceeded { detail: String },

    #[error("component crashed: {message}")]
    Crashed { message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("app not found: {0}")]
    AppNotFound(String),

    #[error("app already loaded: {0}")]
    AppAlreadyLoaded(String),
}

impl BridgeError {
    /// The component's error code, for component-reported failures only.
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Component { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True only for the governor's own deadline overrun.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
