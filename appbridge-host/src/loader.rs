//! Component loading: read, compile (optionally cached), check the
//! exported ABI version, instantiate and enumerate capabilities.

use crate::config::BridgeConfig;
use crate::engine::ComponentInstance;
use crate::error::LoadError;
use crate::registry::CapabilityRegistry;
use crate::sandbox::{EPOCH_TICK_INTERVAL, EpochTicker, WasmComponent};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use wasmtime::component::Component;
use wasmtime::{Config, Engine};

/// Interface version this host implements.
pub const HOST_ABI_VERSION: &str = "3.0.0";

/// Component ABI versions this host can drive.
pub const SUPPORTED_ABI_VERSIONS: &[&str] = &[HOST_ABI_VERSION];

const TRIGGERS_INTERFACE: &str = "standout:app/triggers";
const ACTIONS_INTERFACE: &str = "standout:app/actions";

/// A loaded component together with its load-time capability registry.
pub struct LoadedComponent {
    pub instance: Box<dyn ComponentInstance>,
    pub registry: CapabilityRegistry,
}

/// Compiles and instantiates components against one shared engine.
///
/// Cloning is cheap; all clones share the engine and its epoch ticker.
#[derive(Clone)]
pub struct Loader {
    engine: Engine,
    config: BridgeConfig,
    ticker: Arc<EpochTicker>,
}

impl Loader {
    pub fn new(config: BridgeConfig) -> Result<Self, LoadError> {
        let mut wasm_config = Config::new();
        wasm_config.wasm_component_model(true);
        wasm_config.consume_fuel(true);
        wasm_config.epoch_interruption(true);

        let engine = Engine::new(&wasm_config).map_err(|e| LoadError::Engine(e.to_string()))?;
        let ticker = Arc::new(EpochTicker::start(engine.clone(), EPOCH_TICK_INTERVAL)?);

        Ok(Self {
            engine,
            config,
            ticker,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Loads the component at `path` and enumerates its capabilities.
    pub fn load(&self, path: &Path) -> Result<LoadedComponent, LoadError> {
        info!(path = %path.display(), "Loading Wasm component");

        let wasm_bytes = std::fs::read(path).map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let component = if self.config.cache_compiled {
            self.compile_cached(path, &wasm_bytes)?
        } else {
            self.compile(path, &wasm_bytes)?
        };

        self.check_abi(path, &component)?;

        let mut sandbox = WasmComponent::instantiate(
            &self.engine,
            &component,
            path,
            &self.config,
            Arc::clone(&self.ticker),
        )?;
        let registry = CapabilityRegistry::enumerate(&mut sandbox)?;

        info!(
            path = %path.display(),
            triggers = registry.trigger_ids().len(),
            actions = registry.action_ids().len(),
            "Component loaded"
        );

        Ok(LoadedComponent {
            instance: Box::new(sandbox),
            registry,
        })
    }

    fn compile(&self, path: &Path, wasm_bytes: &[u8]) -> Result<Component, LoadError> {
        let started = std::time::Instant::now();
        let component =
            Component::new(&self.engine, wasm_bytes).map_err(|e| LoadError::Incompatible {
                path: path.to_path_buf(),
                reason: format!("not a loadable component: {e}"),
            })?;
        info!(
            path = %path.display(),
            size_bytes = wasm_bytes.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Compilation complete"
        );
        Ok(component)
    }

    /// Compiles through a `.cwasm` cache kept next to the source file.
    ///
    /// The cache is keyed by the SHA-256 of the source bytes. A stale or
    /// unreadable cache falls back to compiling; cache writes are best-effort.
    fn compile_cached(&self, path: &Path, wasm_bytes: &[u8]) -> Result<Component, LoadError> {
        let wasm_hash = hex::encode(Sha256::digest(wasm_bytes));
        let cwasm_path = path.with_extension("cwasm");
        let hash_path = path.with_extension("cwasm.sha256");

        let stored_hash = std::fs::read_to_string(&hash_path).unwrap_or_default();
        if stored_hash.trim() == wasm_hash {
            if let Ok(cwasm_bytes) = std::fs::read(&cwasm_path) {
                // SAFETY: the cache was written by `Component::serialize` for
                // source bytes with this hash. Wasmtime rejects artifacts built
                // by an incompatible engine configuration.
                match unsafe { Component::deserialize(&self.engine, &cwasm_bytes) } {
                    Ok(component) => {
                        info!(path = %cwasm_path.display(), "Loaded cached compiled component");
                        return Ok(component);
                    }
                    Err(e) => {
                        warn!(path = %cwasm_path.display(), error = %e, "Cached component rejected, recompiling");
                    }
                }
            }
        }

        let component = self.compile(path, wasm_bytes)?;
        match component.serialize() {
            Ok(serialized) => {
                if let Err(e) = std::fs::write(&cwasm_path, &serialized) {
                    warn!(path = %cwasm_path.display(), error = %e, "Failed to write compiled component cache");
                } else if let Err(e) = std::fs::write(&hash_path, &wasm_hash) {
                    warn!(path = %hash_path.display(), error = %e, "Failed to write component cache hash");
                }
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to serialize compiled component"),
        }
        Ok(component)
    }

    /// Requires both capability interfaces at a supported version.
    fn check_abi(&self, path: &Path, component: &Component) -> Result<(), LoadError> {
        let exported: Vec<String> = component
            .component_type()
            .exports(&self.engine)
            .map(|(name, _)| name.to_string())
            .collect();

        for interface in [TRIGGERS_INTERFACE, ACTIONS_INTERFACE] {
            let version = exported
                .iter()
                .find_map(|name| interface_version(name, interface));
            match version {
                Some(v) if SUPPORTED_ABI_VERSIONS.contains(&v) => {}
                Some(v) => {
                    return Err(LoadError::Incompatible {
                        path: path.to_path_buf(),
                        reason: format!(
                            "{interface}@{v} is not supported (host supports {})",
                            SUPPORTED_ABI_VERSIONS.join(", ")
                        ),
                    });
                }
                None => {
                    return Err(LoadError::Incompatible {
                        path: path.to_path_buf(),
                        reason: format!("component does not export {interface}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Extracts `V` from an export named `interface@V`; unversioned exports
/// report an empty version.
fn interface_version<'a>(export: &'a str, interface: &str) -> Option<&'a str> {
    let rest = export.strip_prefix(interface)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix('@')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interface_versions() {
        assert_eq!(
            interface_version("standout:app/triggers@3.0.0", TRIGGERS_INTERFACE),
            Some("3.0.0")
        );
        assert_eq!(
            interface_version("standout:app/triggers@2.1.0", TRIGGERS_INTERFACE),
            Some("2.1.0")
        );
        assert_eq!(interface_version("standout:app/triggers", TRIGGERS_INTERFACE), Some(""));
        assert_eq!(interface_version("standout:app/triggers-extra@3.0.0", TRIGGERS_INTERFACE), None);
        assert_eq!(interface_version("standout:app/actions@3.0.0", TRIGGERS_INTERFACE), None);
    }

    #[test]
    fn host_supports_its_own_version() {
        assert!(SUPPORTED_ABI_VERSIONS.contains(&HOST_ABI_VERSION));
    }

    #[test]
    fn loader_starts_with_default_config() {
        let loader = Loader::new(BridgeConfig::default()).unwrap();
        assert!(!loader.config().cache_compiled);
    }
}
