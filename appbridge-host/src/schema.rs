//! Schema negotiation.
//!
//! The bridge checks the capability exists, hands the full context
//! (identity included) to the component and returns its answer verbatim.
//! Schema calls share the instance lock with governed calls but are not
//! bounded by the execution deadline.

use crate::engine::{InterruptHandle, InvokeError, SchemaContext};
use crate::error::BridgeError;
use crate::governor::SharedInstance;
use crate::registry::CapabilityRegistry;
use crate::translate;
use appbridge_types::SchemaKind;
use std::sync::Arc;
use tracing::debug;

pub(crate) async fn negotiate(
    instance: &SharedInstance,
    interrupt: &InterruptHandle,
    registry: &CapabilityRegistry,
    kind: SchemaKind,
    id: &str,
    context: SchemaContext,
) -> Result<String, BridgeError> {
    if !registry.contains(kind.capability(), id) {
        return Err(BridgeError::SchemaNotFound {
            kind,
            id: id.to_string(),
        });
    }

    let mut guard = Arc::clone(instance).lock_owned().await;
    // A timed-out call that outlived its grace period may have left this raised.
    interrupt.reset();
    let capability = id.to_string();
    let outcome = tokio::task::spawn_blocking(move || {
        guard.schema(kind, &capability, &context)
    })
    .await;

    match outcome {
        Ok(Ok(schema)) => {
            debug!(kind = %kind, capability = %id, bytes = schema.len(), "Schema resolved");
            Ok(schema)
        }
        Ok(Err(e)) => Err(translate::translate(e)),
        Err(join_error) => Err(translate::translate(InvokeError::Trap(format!(
            "schema call panicked: {join_error}"
        )))),
    }
}
