//! The seam between the bridge and whatever executes component code.
//!
//! The wasmtime sandbox ([`crate::WasmComponent`]) and the in-process
//! [`crate::NativeComponent`] both implement [`ComponentInstance`]. The
//! bridge only ever talks to this trait, so governance is identical for
//! both.

use appbridge_types::{
    ActionContext, ActionResponse, ComponentFault, SchemaKind, TriggerContext, TriggerResponse,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Why a single call into a component did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The component reported a tagged failure.
    Fault(ComponentFault),
    /// Execution stopped because the instance's interrupt was raised.
    Interrupted,
    /// A sandbox ceiling (fuel, memory) was hit.
    ResourceExhausted(String),
    /// The component trapped, or the engine itself failed.
    Trap(String),
}

impl From<ComponentFault> for InvokeError {
    fn from(fault: ComponentFault) -> Self {
        Self::Fault(fault)
    }
}

/// Cross-thread cancellation flag for one component instance.
///
/// The governor raises it when a deadline passes; the engine polls it and
/// unwinds the running call. It is reset before every governed call.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The context a schema lookup is resolved against.
#[derive(Debug, Clone)]
pub enum SchemaContext {
    Trigger(TriggerContext),
    Action(ActionContext),
}

/// One loaded component, as seen by the bridge.
///
/// Calls take `&mut self`: the bridge serializes every call into an
/// instance, so implementations need no internal locking.
pub trait ComponentInstance: Send {
    fn trigger_ids(&mut self) -> Result<Vec<String>, InvokeError>;

    fn action_ids(&mut self) -> Result<Vec<String>, InvokeError>;

    /// Polls a trigger. `deadline` bounds any blocking work done on the
    /// component's behalf (outbound HTTP, for instance).
    fn fetch_events(
        &mut self,
        context: &TriggerContext,
        deadline: Instant,
    ) -> Result<TriggerResponse, InvokeError>;

    fn execute_action(
        &mut self,
        context: &ActionContext,
        deadline: Instant,
    ) -> Result<ActionResponse, InvokeError>;

    /// Resolves a schema. `kind` always matches the variant of `context`.
    fn schema(
        &mut self,
        kind: SchemaKind,
        id: &str,
        context: &SchemaContext,
    ) -> Result<String, InvokeError>;

    /// Handle the governor uses to cancel a running call.
    fn interrupt_handle(&self) -> InterruptHandle;
}
