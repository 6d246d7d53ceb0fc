//! Multi-app lifecycle manager.
//!
//! Owns every loaded [`App`], keyed by app id, and the shared
//! [`Loader`] used to compile them.

use crate::app::{App, app_name};
use crate::config::BridgeConfig;
use crate::engine::ComponentInstance;
use crate::error::{BridgeError, BridgeResult};
use crate::loader::{LoadedComponent, Loader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct AppHost {
    apps: HashMap<String, App>,
    config: BridgeConfig,
    /// Shared engine and ticker; created on the first `.wasm` load.
    loader: Option<Loader>,
}

impl AppHost {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            apps: HashMap::new(),
            config,
            loader: None,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn loader(&mut self) -> BridgeResult<&Loader> {
        if self.loader.is_none() {
            self.loader = Some(Loader::new(self.config.clone())?);
        }
        self.loader
            .as_ref()
            .ok_or_else(|| BridgeError::Config("component loader unavailable".into()))
    }

    // ================================================================
    // Loading / Unloading
    // ================================================================

    /// Loads a component under its file stem. Returns the app id.
    pub fn load(&mut self, path: &Path) -> BridgeResult<String> {
        let id = app_name(path);
        self.load_with_id(id.clone(), path)?;
        Ok(id)
    }

    pub fn load_with_id(&mut self, id: impl Into<String>, path: &Path) -> BridgeResult<()> {
        let id = id.into();
        if self.apps.contains_key(&id) {
            return Err(BridgeError::AppAlreadyLoaded(id));
        }
        let loaded = self.loader()?.load(path)?;
        self.register(id, loaded);
        Ok(())
    }

    /// Compiles several components in parallel, then registers them in
    /// order. Returns one result per input path.
    pub fn load_all(&mut self, paths: &[PathBuf]) -> Vec<BridgeResult<String>> {
        let loader = match self.loader() {
            Ok(loader) => loader.clone(),
            Err(e) => {
                let message = e.to_string();
                return paths
                    .iter()
                    .map(|_| Err(BridgeError::Config(message.clone())))
                    .collect();
            }
        };

        let loaded: Vec<BridgeResult<LoadedComponent>> = std::thread::scope(|s| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| {
                    let loader = loader.clone();
                    s.spawn(move || loader.load(path))
                })
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| {
                            Err(crate::error::LoadError::Engine(
                                "thread panicked during component load".into(),
                            ))
                        })
                        .map_err(BridgeError::from)
                })
                .collect()
        });

        paths
            .iter()
            .zip(loaded)
            .map(|(path, result)| {
                let loaded = result?;
                let id = app_name(path);
                if self.apps.contains_key(&id) {
                    return Err(BridgeError::AppAlreadyLoaded(id));
                }
                self.register(id.clone(), loaded);
                Ok(id)
            })
            .collect()
    }

    /// Registers an in-process component under `id`.
    pub fn insert(&mut self, id: impl Into<String>, instance: Box<dyn ComponentInstance>) -> BridgeResult<()> {
        let id = id.into();
        if self.apps.contains_key(&id) {
            return Err(BridgeError::AppAlreadyLoaded(id));
        }
        let app = App::from_instance(id.clone(), instance, &self.config.limits)?;
        info!(app = %id, "App registered (in-process)");
        self.apps.insert(id, app);
        Ok(())
    }

    fn register(&mut self, id: String, loaded: LoadedComponent) {
        let app = App::from_loaded(id.clone(), loaded, &self.config.limits);
        info!(
            app = %id,
            triggers = app.trigger_ids().len(),
            actions = app.action_ids().len(),
            "App loaded"
        );
        self.apps.insert(id, app);
    }

    pub fn unload(&mut self, id: &str) -> BridgeResult<()> {
        match self.apps.remove(id) {
            Some(_) => {
                info!(app = %id, "App unloaded");
                Ok(())
            }
            None => Err(BridgeError::AppNotFound(id.to_string())),
        }
    }

    // ================================================================
    // App access
    // ================================================================

    pub fn get(&self, id: &str) -> BridgeResult<&App> {
        self.apps
            .get(id)
            .ok_or_else(|| BridgeError::AppNotFound(id.to_string()))
    }

    /// Loaded app ids, sorted.
    pub fn app_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.apps.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.apps.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

impl Default for AppHost {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}
