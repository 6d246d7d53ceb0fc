//! The caller-facing handle for one loaded component.

use crate::config::{BridgeConfig, ExecutionLimits};
use crate::engine::{ComponentInstance, InterruptHandle, SchemaContext};
use crate::error::{BridgeError, LoadError, Phase};
use crate::governor::{ExecutionGovernor, SharedInstance};
use crate::loader::{LoadedComponent, Loader};
use crate::registry::CapabilityRegistry;
use crate::schema;
use crate::validator::ResponseValidator;
use appbridge_types::{ActionContext, ActionResponse, SchemaKind, TriggerContext, TriggerResponse};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// A loaded component plus the governance wrapped around every call.
///
/// Calls on one `App` are serialized; separate `App`s share nothing and
/// may run concurrently.
pub struct App {
    name: String,
    instance: SharedInstance,
    interrupt: InterruptHandle,
    registry: CapabilityRegistry,
    governor: ExecutionGovernor,
    validator: ResponseValidator,
}

impl App {
    /// Loads a `.wasm` component with its own engine.
    ///
    /// Embedders loading many components should share a [`Loader`]
    /// (or use [`crate::AppHost`]) instead.
    pub fn load(path: &Path, config: BridgeConfig) -> Result<Self, BridgeError> {
        let limits = config.limits.clone();
        let loader = Loader::new(config)?;
        let loaded = loader.load(path)?;
        Ok(Self::from_loaded(app_name(path), loaded, &limits))
    }

    pub fn from_loaded(name: impl Into<String>, loaded: LoadedComponent, limits: &ExecutionLimits) -> Self {
        let LoadedComponent { instance, registry } = loaded;
        Self::assemble(name.into(), instance, registry, limits)
    }

    /// Wraps an already-running instance, enumerating its capabilities now.
    pub fn from_instance(
        name: impl Into<String>,
        mut instance: Box<dyn ComponentInstance>,
        limits: &ExecutionLimits,
    ) -> Result<Self, LoadError> {
        let registry = CapabilityRegistry::enumerate(instance.as_mut())?;
        Ok(Self::assemble(name.into(), instance, registry, limits))
    }

    fn assemble(
        name: String,
        instance: Box<dyn ComponentInstance>,
        registry: CapabilityRegistry,
        limits: &ExecutionLimits,
    ) -> Self {
        let interrupt = instance.interrupt_handle();
        Self {
            name,
            instance: Arc::new(Mutex::new(instance)),
            interrupt,
            registry,
            governor: ExecutionGovernor::new(limits),
            validator: ResponseValidator::new(limits),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trigger ids captured at load time, sorted.
    pub fn trigger_ids(&self) -> Vec<String> {
        self.registry.trigger_ids()
    }

    /// Action ids captured at load time, sorted.
    pub fn action_ids(&self) -> Vec<String> {
        self.registry.action_ids()
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.governor.timeout()
    }

    /// Polls a trigger. The response is validated before it is returned.
    pub async fn fetch_events(&self, context: &TriggerContext) -> Result<TriggerResponse, BridgeError> {
        let ctx = context.clone();
        let response = self
            .governor
            .invoke(
                Phase::Polling,
                context.trigger_id(),
                &self.instance,
                &self.interrupt,
                move |instance, deadline| instance.fetch_events(&ctx, deadline),
            )
            .await?;
        self.validator.check_trigger(&response)?;
        debug!(
            app = %self.name,
            trigger = %context.trigger_id(),
            events = response.events.len(),
            "Trigger polled"
        );
        Ok(response)
    }

    /// Executes an action. The output is validated before it is returned.
    pub async fn execute_action(&self, context: &ActionContext) -> Result<ActionResponse, BridgeError> {
        let ctx = context.clone();
        let response = self
            .governor
            .invoke(
                Phase::Action,
                context.action_id(),
                &self.instance,
                &self.interrupt,
                move |instance, deadline| instance.execute_action(&ctx, deadline),
            )
            .await?;
        self.validator.check_action(&response)?;
        debug!(
            app = %self.name,
            action = %context.action_id(),
            output_bytes = response.serialized_output.len(),
            "Action executed"
        );
        Ok(response)
    }

    pub async fn trigger_input_schema(&self, id: &str, context: &TriggerContext) -> Result<String, BridgeError> {
        self.schema(SchemaKind::TriggerInput, id, SchemaContext::Trigger(context.clone()))
            .await
    }

    pub async fn trigger_output_schema(&self, id: &str, context: &TriggerContext) -> Result<String, BridgeError> {
        self.schema(SchemaKind::TriggerOutput, id, SchemaContext::Trigger(context.clone()))
            .await
    }

    pub async fn action_input_schema(&self, id: &str, context: &ActionContext) -> Result<String, BridgeError> {
        self.schema(SchemaKind::ActionInput, id, SchemaContext::Action(context.clone()))
            .await
    }

    pub async fn action_output_schema(&self, id: &str, context: &ActionContext) -> Result<String, BridgeError> {
        self.schema(SchemaKind::ActionOutput, id, SchemaContext::Action(context.clone()))
            .await
    }

    async fn schema(&self, kind: SchemaKind, id: &str, context: SchemaContext) -> Result<String, BridgeError> {
        schema::negotiate(&self.instance, &self.interrupt, &self.registry, kind, id, context).await
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("registry", &self.registry)
            .field("governor", &self.governor)
            .finish_non_exhaustive()
    }
}

/// Default app id: the file stem of the component path.
pub(crate) fn app_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::NativeComponent;
    use appbridge_types::{ComponentFault, Identity};

    fn todo_app() -> App {
        let mut component = NativeComponent::new();
        component
            .register_trigger(
                "new-todos",
                |ctx: &TriggerContext| Ok(TriggerResponse::new(ctx.store(), Vec::new())),
                "{}",
                "{}",
            )
            .unwrap();
        App::from_instance("todo", Box::new(component), &ExecutionLimits::default()).unwrap()
    }

    #[test]
    fn app_name_is_file_stem() {
        assert_eq!(app_name(Path::new("/apps/todo.wasm")), "todo");
        assert_eq!(app_name(Path::new("component")), "component");
    }

    #[tokio::test]
    async fn store_round_trips_when_unchanged() {
        let app = todo_app();
        let identity = Identity::new("1", "Test", "{}").unwrap();
        let ctx = TriggerContext::new("new-todos", identity, "cursor-42").unwrap();
        let response = app.fetch_events(&ctx).await.unwrap();
        assert_eq!(response.store, "cursor-42");
        assert!(response.events.is_empty());
    }

    #[test]
    fn duplicate_ids_from_instance_fail_at_load() {
        struct Dupes;
        impl ComponentInstance for Dupes {
            fn trigger_ids(&mut self) -> Result<Vec<String>, crate::engine::InvokeError> {
                Ok(vec!["a".into(), "a".into()])
            }
            fn action_ids(&mut self) -> Result<Vec<String>, crate::engine::InvokeError> {
                Ok(Vec::new())
            }
            fn fetch_events(
                &mut self,
                _: &TriggerContext,
                _: std::time::Instant,
            ) -> Result<TriggerResponse, crate::engine::InvokeError> {
                Err(ComponentFault::new("other", "").into())
            }
            fn execute_action(
                &mut self,
                _: &ActionContext,
                _: std::time::Instant,
            ) -> Result<ActionResponse, crate::engine::InvokeError> {
                Err(ComponentFault::new("other", "").into())
            }
            fn schema(
                &mut self,
                _: SchemaKind,
                _: &str,
                _: &SchemaContext,
            ) -> Result<String, crate::engine::InvokeError> {
                Ok("{}".into())
            }
            fn interrupt_handle(&self) -> InterruptHandle {
                InterruptHandle::new()
            }
        }

        let err = App::from_instance("dupes", Box::new(Dupes), &ExecutionLimits::default()).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateCapability { .. }));
    }
}
