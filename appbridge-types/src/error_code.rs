//! The stable failure vocabulary shared by components and callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recognized component failure tags.
///
/// Components report failures as a tag string; anything the host does not
/// know maps to [`ErrorCode::Other`] so newer guest SDKs can add tags
/// without breaking older hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    Unauthenticated,
    Forbidden,
    Misconfigured,
    Unsupported,
    RateLimit,
    /// Reported by the component about its upstream. The bridge's own
    /// deadline overrun is a separate error.
    Timeout,
    Unavailable,
    InternalError,
    MalformedResponse,
    Other,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 10] = [
        Self::Unauthenticated,
        Self::Forbidden,
        Self::Misconfigured,
        Self::Unsupported,
        Self::RateLimit,
        Self::Timeout,
        Self::Unavailable,
        Self::InternalError,
        Self::MalformedResponse,
        Self::Other,
    ];

    /// Maps a wire tag to a code. Total: unknown tags become `Other`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "unauthenticated" => Self::Unauthenticated,
            "forbidden" => Self::Forbidden,
            "misconfigured" => Self::Misconfigured,
            "unsupported" => Self::Unsupported,
            "rate-limit" => Self::RateLimit,
            "timeout" => Self::Timeout,
            "unavailable" => Self::Unavailable,
            "internal-error" => Self::InternalError,
            "malformed-response" => Self::MalformedResponse,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::Misconfigured => "misconfigured",
            Self::Unsupported => "unsupported",
            Self::RateLimit => "rate-limit",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::InternalError => "internal-error",
            Self::MalformedResponse => "malformed-response",
            Self::Other => "other",
        }
    }

    /// Human-readable message used when a component sends none.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Unauthenticated => "Authentication failed",
            Self::Forbidden => "Access denied",
            Self::Misconfigured => "Misconfigured integration",
            Self::Unsupported => "The target system does not support this",
            Self::RateLimit => "Rate limit exceeded at the target system",
            Self::Timeout => "Timeout at the target system",
            Self::Unavailable => "The target system is unavailable",
            Self::InternalError => "Internal error in the app",
            Self::MalformedResponse => "Malformed response from the target system",
            Self::Other => "Unknown error",
        }
    }

    /// Whether a retry after backing off is likely to help.
    ///
    /// Advisory only: the bridge never retries on its own.
    #[must_use]
    pub const fn suggests_backoff(self) -> bool {
        matches!(self, Self::RateLimit | Self::Unavailable | Self::Timeout)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A failure exactly as a component reported it, before translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFault {
    pub tag: String,
    pub message: String,
}

impl ComponentFault {
    pub fn new(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
        }
    }

    /// Convenience for native components reporting a known code.
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code.as_tag(), message)
    }
}
