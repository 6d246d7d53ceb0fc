//! Wasmtime-backed component instance.
//!
//! Each `WasmComponent` owns a `wasmtime::Store` with:
//! - Memory isolation (configurable ceiling, tracked by `TrackingLimiter`)
//! - A CPU fuel budget refilled before every call
//! - Cooperative interruption through an epoch-deadline callback
//! - The `http` and `environment` host imports
//!
//! A trap leaves a component instance unusable, so the next call after a
//! trap transparently re-instantiates from the pre-linked component.

use crate::bindings::standout::app::{environment, http, types};
use crate::bindings::{Bridge, BridgePre};
use crate::config::BridgeConfig;
use crate::engine::{ComponentInstance, InterruptHandle, InvokeError, SchemaContext};
use crate::error::LoadError;
use crate::http::{HttpError, HttpGateway, OutboundRequest};
use appbridge_types::{
    ActionContext, ActionResponse, ComponentFault, Identity, SchemaKind, TriggerContext,
    TriggerEvent, TriggerResponse,
};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use wasmtime::component::{Component, Linker, ResourceTable};
use wasmtime::{Engine, ResourceLimiter, Store, StoreContextMut, Trap, UpdateDeadline};
use wasmtime_wasi::p2::{IoView, WasiCtx, WasiCtxBuilder, WasiView};

/// Epoch tick interval; the granularity of interrupt checks.
pub const EPOCH_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// A resource limiter that tracks actual memory usage.
pub struct TrackingLimiter {
    /// Maximum memory allowed in bytes.
    max_memory: usize,
    /// Current memory allocated (tracked via grow callbacks).
    current_memory: usize,
    /// Set when a growth request was refused during the current call.
    denied: bool,
    max_table_elements: usize,
    max_instances: usize,
    max_tables: usize,
    max_memories: usize,
}

impl TrackingLimiter {
    pub fn new(max_memory: usize) -> Self {
        Self {
            max_memory,
            current_memory: 0,
            denied: false,
            max_table_elements: 20_000,
            max_instances: 50,
            max_tables: 100,
            max_memories: 50,
        }
    }

    pub fn current_memory_bytes(&self) -> usize {
        self.current_memory
    }

    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory
    }

    fn take_denied(&mut self) -> bool {
        std::mem::take(&mut self.denied)
    }
}

impl ResourceLimiter for TrackingLimiter {
    fn memory_growing(
        &mut self,
        current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        if desired <= self.max_memory {
            self.current_memory = desired;
            Ok(true)
        } else {
            self.denied = true;
            debug!(
                current = current,
                desired = desired,
                max = self.max_memory,
                "Memory growth denied - would exceed limit"
            );
            Ok(false)
        }
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        let allowed = desired <= self.max_table_elements;
        if !allowed {
            self.denied = true;
        }
        Ok(allowed)
    }

    fn instances(&self) -> usize {
        self.max_instances
    }

    fn tables(&self) -> usize {
        self.max_tables
    }

    fn memories(&self) -> usize {
        self.max_memories
    }
}

/// State stored in each component's `wasmtime::Store`.
/// Also implements the host import traits.
pub struct HostState {
    /// WASI context; empty (no filesystem, no inherited env, no args).
    wasi_ctx: WasiCtx,
    /// Resource table required by WasiView.
    resource_table: ResourceTable,
    limiter: TrackingLimiter,
    environment: HashMap<String, String>,
    http: HttpGateway,
    /// Deadline of the call in progress; `None` for unbounded calls.
    deadline: Option<Instant>,
}

impl HostState {
    fn new(settings: &SandboxSettings) -> Self {
        Self {
            wasi_ctx: WasiCtxBuilder::new().build(),
            resource_table: ResourceTable::new(),
            limiter: TrackingLimiter::new(settings.max_memory_bytes),
            environment: settings.environment.clone(),
            http: settings.http.clone(),
            deadline: None,
        }
    }

    pub fn limiter(&self) -> &TrackingLimiter {
        &self.limiter
    }
}

impl IoView for HostState {
    fn table(&mut self) -> &mut ResourceTable {
        &mut self.resource_table
    }
}

impl WasiView for HostState {
    fn ctx(&mut self) -> &mut WasiCtx {
        &mut self.wasi_ctx
    }
}

impl types::Host for HostState {}

impl http::Host for HostState {
    fn send(
        &mut self,
        request: http::Request,
    ) -> wasmtime::Result<Result<http::Response, http::RequestError>> {
        let outbound = OutboundRequest {
            method: request.method.into(),
            url: request.url,
            headers: request.headers,
            body: request.body,
        };
        let result = self
            .http
            .send(outbound, self.deadline)
            .map(|response| http::Response {
                status: response.status,
                headers: response.headers,
                body: response.body,
            })
            .map_err(|e| match e {
                HttpError::InvalidUrl(m) => http::RequestError::InvalidUrl(m),
                HttpError::Timeout(m) => http::RequestError::Timeout(m),
                HttpError::Other(m) => http::RequestError::Other(m),
            });
        Ok(result)
    }
}

impl environment::Host for HostState {
    fn env_vars(&mut self) -> wasmtime::Result<Vec<(String, String)>> {
        let mut vars: Vec<(String, String)> = self
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        vars.sort();
        Ok(vars)
    }

    fn env_var(&mut self, name: String) -> wasmtime::Result<Option<String>> {
        Ok(self.environment.get(&name).cloned())
    }
}

impl From<http::Method> for reqwest::Method {
    fn from(method: http::Method) -> Self {
        match method {
            http::Method::Get => reqwest::Method::GET,
            http::Method::Post => reqwest::Method::POST,
            http::Method::Put => reqwest::Method::PUT,
            http::Method::Delete => reqwest::Method::DELETE,
            http::Method::Patch => reqwest::Method::PATCH,
            http::Method::Head => reqwest::Method::HEAD,
            http::Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Trap payload raised from the epoch callback when a call is interrupted.
#[derive(Debug)]
struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("component invocation interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// Background thread advancing the engine epoch so running calls observe
/// interrupts promptly.
pub(crate) struct EpochTicker {
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl EpochTicker {
    pub(crate) fn start(engine: Engine, interval: Duration) -> Result<Self, LoadError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("appbridge-epoch-ticker".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::SeqCst) {
                    std::thread::sleep(interval);
                    engine.increment_epoch();
                }
            })
            .map_err(|e| LoadError::Engine(format!("failed to spawn epoch ticker: {e}")))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for EpochTicker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Everything needed to (re)build a store for one component.
#[derive(Clone)]
struct SandboxSettings {
    max_memory_bytes: usize,
    fuel_per_call: u64,
    environment: HashMap<String, String>,
    http: HttpGateway,
}

impl SandboxSettings {
    fn from_config(config: &BridgeConfig) -> Self {
        Self {
            max_memory_bytes: config.sandbox.max_memory_bytes,
            fuel_per_call: config.sandbox.fuel_per_call,
            environment: config.environment.clone(),
            http: HttpGateway::new(config.user_agent.clone()),
        }
    }
}

/// A live instantiation: store plus the typed export bindings.
struct Live {
    store: Store<HostState>,
    bindings: Bridge,
}

/// A sandboxed component instance backed by wasmtime.
pub struct WasmComponent {
    path: PathBuf,
    engine: Engine,
    pre: BridgePre<HostState>,
    settings: SandboxSettings,
    interrupt: InterruptHandle,
    /// `None` after a trap until the next call re-instantiates.
    live: Option<Live>,
    _ticker: Arc<EpochTicker>,
}

impl WasmComponent {
    /// Links and instantiates a compiled component.
    pub(crate) fn instantiate(
        engine: &Engine,
        component: &Component,
        path: &Path,
        config: &BridgeConfig,
        ticker: Arc<EpochTicker>,
    ) -> Result<Self, LoadError> {
        let incompatible = |reason: String| LoadError::Incompatible {
            path: path.to_path_buf(),
            reason,
        };

        let mut linker = Linker::new(engine);
        Bridge::add_to_linker(&mut linker, |state: &mut HostState| state)
            .map_err(|e| LoadError::Engine(e.to_string()))?;
        // WASI preview 2 (required for wasm32-wasip1/wasip2 compiled components)
        wasmtime_wasi::p2::add_to_linker_sync(&mut linker)
            .map_err(|e| LoadError::Engine(e.to_string()))?;

        let instance_pre = linker
            .instantiate_pre(component)
            .map_err(|e| incompatible(format!("unresolved imports: {e}")))?;
        let pre = BridgePre::new(instance_pre)
            .map_err(|e| incompatible(format!("missing exports: {e}")))?;

        let mut sandbox = Self {
            path: path.to_path_buf(),
            engine: engine.clone(),
            pre,
            settings: SandboxSettings::from_config(config),
            interrupt: InterruptHandle::new(),
            live: None,
            _ticker: ticker,
        };
        let live = sandbox
            .build_live()
            .map_err(|e| incompatible(format!("instantiation failed: {e}")))?;
        sandbox.live = Some(live);

        info!(
            path = %sandbox.path.display(),
            max_memory_bytes = sandbox.settings.max_memory_bytes,
            fuel_per_call = sandbox.settings.fuel_per_call,
            "Wasm component instantiated"
        );
        Ok(sandbox)
    }

    fn build_live(&self) -> wasmtime::Result<Live> {
        let mut store = Store::new(&self.engine, HostState::new(&self.settings));
        store.limiter(|s| &mut s.limiter);
        store.set_fuel(self.settings.fuel_per_call)?;
        store.set_epoch_deadline(1);

        let interrupt = self.interrupt.clone();
        store.epoch_deadline_callback(move |ctx: StoreContextMut<'_, HostState>| {
            let expired = ctx.data().deadline.is_some_and(|d| Instant::now() >= d);
            if interrupt.is_interrupted() || expired {
                return Err(Interrupted.into());
            }
            Ok(UpdateDeadline::Continue(1))
        });

        let bindings = self.pre.instantiate(&mut store)?;
        Ok(Live { store, bindings })
    }

    /// Returns the live instantiation, rebuilding it after a trap.
    fn live(&mut self, deadline: Option<Instant>) -> Result<&mut Live, InvokeError> {
        if self.live.is_none() {
            debug!(path = %self.path.display(), "Re-instantiating component after trap");
            let live = self
                .build_live()
                .map_err(|e| InvokeError::Trap(format!("re-instantiation failed: {e}")))?;
            self.live = Some(live);
        }
        let fuel = self.settings.fuel_per_call;
        let live = self
            .live
            .as_mut()
            .ok_or_else(|| InvokeError::Trap("no live instance".into()))?;
        if let Err(e) = live.store.set_fuel(fuel) {
            warn!(error = %e, "Failed to refill fuel");
        }
        live.store.set_epoch_deadline(1);
        live.store.data_mut().deadline = deadline;
        Ok(live)
    }

    /// Converts a call result, dropping the instance if it trapped.
    fn finish<T>(
        &mut self,
        result: wasmtime::Result<Result<T, types::AppError>>,
    ) -> Result<T, InvokeError> {
        let denied = match self.live.as_mut() {
            Some(live) => {
                live.store.data_mut().deadline = None;
                live.store.data_mut().limiter.take_denied()
            }
            None => false,
        };

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(app_error)) => Err(InvokeError::Fault(ComponentFault::new(
                app_error.code,
                app_error.message,
            ))),
            Err(error) => {
                self.live = None;
                Err(self.classify(error, denied))
            }
        }
    }

    fn classify(&self, error: wasmtime::Error, memory_denied: bool) -> InvokeError {
        if error.downcast_ref::<Interrupted>().is_some() || self.interrupt.is_interrupted() {
            return InvokeError::Interrupted;
        }
        if let Some(Trap::OutOfFuel) = error.downcast_ref::<Trap>() {
            return InvokeError::ResourceExhausted(format!(
                "fuel budget of {} instructions exhausted",
                self.settings.fuel_per_call
            ));
        }
        if memory_denied {
            return InvokeError::ResourceExhausted(format!(
                "memory ceiling of {} bytes reached",
                self.settings.max_memory_bytes
            ));
        }
        InvokeError::Trap(format!("{error:#}"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Linear memory currently held by the instance, if it is live.
    pub fn memory_used_bytes(&self) -> Option<usize> {
        self.live
            .as_ref()
            .map(|live| live.store.data().limiter().current_memory_bytes())
    }
}

impl ComponentInstance for WasmComponent {
    fn trigger_ids(&mut self) -> Result<Vec<String>, InvokeError> {
        let live = self.live(None)?;
        let result = live
            .bindings
            .standout_app_triggers()
            .call_trigger_ids(&mut live.store);
        self.finish(result)
    }

    fn action_ids(&mut self) -> Result<Vec<String>, InvokeError> {
        let live = self.live(None)?;
        let result = live
            .bindings
            .standout_app_actions()
            .call_action_ids(&mut live.store);
        self.finish(result)
    }

    fn fetch_events(
        &mut self,
        context: &TriggerContext,
        deadline: Instant,
    ) -> Result<TriggerResponse, InvokeError> {
        let wit_context = wit_trigger_context(context);
        let live = self.live(Some(deadline))?;
        let result = live
            .bindings
            .standout_app_triggers()
            .call_fetch_events(&mut live.store, &wit_context);
        self.finish(result).map(|response| TriggerResponse {
            store: response.store,
            events: response
                .events
                .into_iter()
                .map(|e| TriggerEvent {
                    id: e.id,
                    serialized_data: e.serialized_data,
                })
                .collect(),
        })
    }

    fn execute_action(
        &mut self,
        context: &ActionContext,
        deadline: Instant,
    ) -> Result<ActionResponse, InvokeError> {
        let wit_context = wit_action_context(context);
        let live = self.live(Some(deadline))?;
        let result = live
            .bindings
            .standout_app_actions()
            .call_execute(&mut live.store, &wit_context);
        self.finish(result).map(|response| ActionResponse {
            serialized_output: response.serialized_output,
        })
    }

    fn schema(
        &mut self,
        kind: SchemaKind,
        id: &str,
        context: &SchemaContext,
    ) -> Result<String, InvokeError> {
        let live = self.live(None)?;
        let triggers = live.bindings.standout_app_triggers();
        let actions = live.bindings.standout_app_actions();
        let result = match (kind, context) {
            (SchemaKind::TriggerInput, SchemaContext::Trigger(ctx)) => {
                triggers.call_input_schema(&mut live.store, id, &wit_trigger_context(ctx))
            }
            (SchemaKind::TriggerOutput, SchemaContext::Trigger(ctx)) => {
                triggers.call_output_schema(&mut live.store, id, &wit_trigger_context(ctx))
            }
            (SchemaKind::ActionInput, SchemaContext::Action(ctx)) => {
                actions.call_input_schema(&mut live.store, id, &wit_action_context(ctx))
            }
            (SchemaKind::ActionOutput, SchemaContext::Action(ctx)) => {
                actions.call_output_schema(&mut live.store, id, &wit_action_context(ctx))
            }
            _ => {
                return Err(InvokeError::Trap(format!(
                    "{kind} schema requested with a mismatched context"
                )));
            }
        };
        self.finish(result)
    }

    fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }
}

fn wit_identity(identity: &Identity) -> types::Identity {
    types::Identity {
        id: identity.id().to_string(),
        name: identity.name().to_string(),
        serialized_profile: identity.serialized_profile().to_string(),
    }
}

fn wit_trigger_context(context: &TriggerContext) -> types::TriggerContext {
    types::TriggerContext {
        trigger_id: context.trigger_id().to_string(),
        identity: wit_identity(context.identity()),
        store: context.store().to_string(),
        serialized_input: context.serialized_input().to_string(),
    }
}

fn wit_action_context(context: &ActionContext) -> types::ActionContext {
    types::ActionContext {
        action_id: context.action_id().to_string(),
        identity: wit_identity(context.identity()),
        serialized_input: context.serialized_input().to_string(),
    }
}
