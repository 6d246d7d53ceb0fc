//! Maps component-side failures onto [`BridgeError`].
//!
//! Translation is total: every input yields exactly one error and nothing
//! here can panic or fail.

use crate::engine::InvokeError;
use crate::error::BridgeError;
use appbridge_types::{ComponentFault, ErrorCode};

/// Translates a tagged component failure.
///
/// Unknown tags become [`ErrorCode::Other`]; a blank message is replaced by
/// the code's default template.
pub fn translate_fault(fault: ComponentFault) -> BridgeError {
    let code = ErrorCode::from_tag(&fault.tag);
    let message = if fault.message.trim().is_empty() {
        code.default_message().to_string()
    } else {
        fault.message
    };
    BridgeError::Component { code, message }
}

/// Translates any invocation failure.
///
/// `Interrupted` outside a governed call has no deadline to report, so it
/// surfaces as a crash.
pub fn translate(error: InvokeError) -> BridgeError {
    match error {
        InvokeError::Fault(fault) => translate_fault(fault),
        InvokeError::ResourceExhausted(detail) => BridgeError::ResourceLimitExceeded { detail },
        InvokeError::Trap(message) => BridgeError::Crashed { message },
        InvokeError::Interrupted => BridgeError::Crashed {
            message: "invocation interrupted".into(),
        },
    }
}

/// One-line description used in load-time error messages.
pub(crate) fn describe(error: &InvokeError) -> String {
    match error {
        InvokeError::Fault(fault) => format!("{} ({})", fault.message, fault.tag),
        InvokeError::Interrupted => "interrupted".into(),
        InvokeError::ResourceExhausted(detail) => detail.clone(),
        InvokeError::Trap(message) => message.clone(),
    }
}
