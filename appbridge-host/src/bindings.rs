//! Wasmtime Component Model bindings generated from `wit/bridge.wit`.
//!
//! Uses `wasmtime::component::bindgen!` to produce:
//! - Host import traits that we implement (http, environment)
//! - Guest export callable interfaces (triggers, actions)

use wasmtime::component::bindgen;

bindgen!({
    path: "wit",
    world: "bridge",
    // Fully synchronous: http::send blocks on the host side.
    async: false,
    // Host imports return wasmtime::Result so they can trap.
    trappable_imports: true,
});
