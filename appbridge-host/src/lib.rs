//! Wasmtime-based host for AppBridge components.
//!
//! Loads Wasm Component Model apps exposing triggers and actions, and wraps
//! every call in the bridge's governance: a per-call deadline, response
//! size and count ceilings, identity-aware schema negotiation and a stable
//! error taxonomy.
//!
//! Each component runs in its own `wasmtime::Store` with memory isolation,
//! a CPU fuel budget and cooperative interruption. Calls into one component
//! are serialized; separate components share no mutable state.

pub mod bindings;
mod app;
mod config;
mod engine;
mod error;
mod governor;
mod host;
mod http;
mod loader;
mod native;
mod registry;
mod sandbox;
mod schema;
mod translate;
mod validator;

pub use app::App;
pub use config::{
    BridgeConfig, DEFAULT_CANCEL_GRACE, DEFAULT_MAX_EVENTS, DEFAULT_MAX_PAYLOAD_BYTES,
    DEFAULT_TIMEOUT, ExecutionLimits, SandboxLimits,
};
pub use engine::{ComponentInstance, InterruptHandle, InvokeError, SchemaContext};
pub use error::{BridgeError, BridgeResult, LoadError, Phase};
pub use governor::ExecutionGovernor;
pub use host::AppHost;
pub use http::{HttpError, HttpGateway, OutboundRequest, OutboundResponse};
pub use loader::{HOST_ABI_VERSION, LoadedComponent, Loader, SUPPORTED_ABI_VERSIONS};
pub use native::{NativeComponent, SchemaSource};
pub use registry::CapabilityRegistry;
pub use sandbox::{TrackingLimiter, WasmComponent};
pub use translate::{translate, translate_fault};
pub use validator::ResponseValidator;

pub use appbridge_types::{
    ActionContext, ActionResponse, CapabilityKind, ComponentFault, ErrorCode, Identity, SchemaKind,
    TriggerContext, TriggerEvent, TriggerResponse,
};
