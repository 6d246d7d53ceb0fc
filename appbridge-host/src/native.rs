//! In-process components.
//!
//! A `NativeComponent` is a component whose triggers and actions are plain
//! Rust closures. It implements the same [`ComponentInstance`] seam as the
//! wasmtime sandbox, which makes it the vehicle for first-party apps and
//! for exercising the bridge without compiled fixtures.

use crate::engine::{ComponentInstance, InterruptHandle, InvokeError, SchemaContext};
use crate::error::LoadError;
use appbridge_types::{
    ActionContext, ActionResponse, CapabilityKind, ComponentFault, ErrorCode, Identity,
    SchemaKind, TriggerContext, TriggerResponse,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

type TriggerHandler =
    Box<dyn Fn(&TriggerContext) -> Result<TriggerResponse, ComponentFault> + Send + Sync>;
type ActionHandler =
    Box<dyn Fn(&ActionContext) -> Result<ActionResponse, ComponentFault> + Send + Sync>;

/// Where a capability's JSON Schema comes from.
#[derive(Clone)]
pub enum SchemaSource {
    Static(String),
    /// Resolved per caller, e.g. to expose premium-tier fields.
    PerIdentity(Arc<dyn Fn(&Identity) -> String + Send + Sync>),
}

impl SchemaSource {
    pub fn per_identity<F>(f: F) -> Self
    where
        F: Fn(&Identity) -> String + Send + Sync + 'static,
    {
        Self::PerIdentity(Arc::new(f))
    }

    fn resolve(&self, identity: &Identity) -> String {
        match self {
            Self::Static(schema) => schema.clone(),
            Self::PerIdentity(f) => f(identity),
        }
    }
}

impl From<&str> for SchemaSource {
    fn from(schema: &str) -> Self {
        Self::Static(schema.to_string())
    }
}

impl From<String> for SchemaSource {
    fn from(schema: String) -> Self {
        Self::Static(schema)
    }
}

struct Descriptor<H> {
    handler: H,
    input_schema: SchemaSource,
    output_schema: SchemaSource,
}

#[derive(Default)]
pub struct NativeComponent {
    triggers: HashMap<String, Descriptor<TriggerHandler>>,
    actions: HashMap<String, Descriptor<ActionHandler>>,
    interrupt: InterruptHandle,
}

impl NativeComponent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a trigger. Registering the same id twice is a load-time
    /// failure, never a runtime one.
    pub fn register_trigger<F>(
        &mut self,
        id: impl Into<String>,
        handler: F,
        input_schema: impl Into<SchemaSource>,
        output_schema: impl Into<SchemaSource>,
    ) -> Result<&mut Self, LoadError>
    where
        F: Fn(&TriggerContext) -> Result<TriggerResponse, ComponentFault> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.triggers.contains_key(&id) {
            return Err(LoadError::DuplicateCapability {
                kind: CapabilityKind::Trigger,
                id,
            });
        }
        self.triggers.insert(
            id,
            Descriptor {
                handler: Box::new(handler),
                input_schema: input_schema.into(),
                output_schema: output_schema.into(),
            },
        );
        Ok(self)
    }

    pub fn register_action<F>(
        &mut self,
        id: impl Into<String>,
        handler: F,
        input_schema: impl Into<SchemaSource>,
        output_schema: impl Into<SchemaSource>,
    ) -> Result<&mut Self, LoadError>
    where
        F: Fn(&ActionContext) -> Result<ActionResponse, ComponentFault> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.actions.contains_key(&id) {
            return Err(LoadError::DuplicateCapability {
                kind: CapabilityKind::Action,
                id,
            });
        }
        self.actions.insert(
            id,
            Descriptor {
                handler: Box::new(handler),
                input_schema: input_schema.into(),
                output_schema: output_schema.into(),
            },
        );
        Ok(self)
    }
}

fn not_registered(kind: CapabilityKind, id: &str) -> InvokeError {
    InvokeError::Fault(ComponentFault::from_code(
        ErrorCode::InternalError,
        format!("{kind} {id} is not registered"),
    ))
}

impl ComponentInstance for NativeComponent {
    fn trigger_ids(&mut self) -> Result<Vec<String>, InvokeError> {
        Ok(self.triggers.keys().cloned().collect())
    }

    fn action_ids(&mut self) -> Result<Vec<String>, InvokeError> {
        Ok(self.actions.keys().cloned().collect())
    }

    fn fetch_events(
        &mut self,
        context: &TriggerContext,
        _deadline: Instant,
    ) -> Result<TriggerResponse, InvokeError> {
        let descriptor = self
            .triggers
            .get(context.trigger_id())
            .ok_or_else(|| not_registered(CapabilityKind::Trigger, context.trigger_id()))?;
        (descriptor.handler)(context).map_err(InvokeError::Fault)
    }

    fn execute_action(
        &mut self,
        context: &ActionContext,
        _deadline: Instant,
    ) -> Result<ActionResponse, InvokeError> {
        let descriptor = self
            .actions
            .get(context.action_id())
            .ok_or_else(|| not_registered(CapabilityKind::Action, context.action_id()))?;
        (descriptor.handler)(context).map_err(InvokeError::Fault)
    }

    fn schema(
        &mut self,
        kind: SchemaKind,
        id: &str,
        context: &SchemaContext,
    ) -> Result<String, InvokeError> {
        let (source, identity) = match context {
            SchemaContext::Trigger(ctx) => {
                let d = self
                    .triggers
                    .get(id)
                    .ok_or_else(|| not_registered(CapabilityKind::Trigger, id))?;
                let source = if kind.is_input() { &d.input_schema } else { &d.output_schema };
                (source, ctx.identity())
            }
            SchemaContext::Action(ctx) => {
                let d = self
                    .actions
                    .get(id)
                    .ok_or_else(|| not_registered(CapabilityKind::Action, id))?;
                let source = if kind.is_input() { &d.input_schema } else { &d.output_schema };
                (source, ctx.identity())
            }
        };
        Ok(source.resolve(identity))
    }

    fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }
}
