//! Bridge configuration, optionally read from a TOML file.
//!
//! ```toml
//! [limits]
//! timeout_secs = 30
//! max_events = 100
//! max_store_bytes = 65536
//! max_output_bytes = 65536
//! cancel_grace_ms = 2000
//!
//! [sandbox]
//! max_memory_bytes = 67108864
//! fuel_per_call = 1000000000
//!
//! [cache]
//! compiled = true
//!
//! [http]
//! user_agent = "AppBridge/3.0.0"
//!
//! [environment]
//! API_BASE = "https://example.com"
//! ```

use crate::error::BridgeError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_EVENTS: usize = 100;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_millis(2_000);

/// Per-call ceilings applied by the governor and the response validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Deadline for one trigger poll or action run.
    pub timeout: Duration,
    pub max_events: usize,
    pub max_store_bytes: usize,
    pub max_output_bytes: usize,
    /// How long a timed-out call may take to unwind after being interrupted.
    pub cancel_grace: Duration,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_events: DEFAULT_MAX_EVENTS,
            max_store_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_output_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            cancel_grace: DEFAULT_CANCEL_GRACE,
        }
    }
}

/// Hard ceilings for a wasmtime sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLimits {
    /// Maximum linear memory in bytes.
    pub max_memory_bytes: usize,
    /// CPU fuel budget per invocation (prevents infinite loops).
    pub fuel_per_call: u64,
}

impl SandboxLimits {
    pub fn standard() -> Self {
        Self {
            max_memory_bytes: 64 * 1024 * 1024, // 64MB
            fuel_per_call: 1_000_000_000,       // ~1 billion instructions
        }
    }

    pub fn constrained() -> Self {
        Self {
            max_memory_bytes: 32 * 1024 * 1024, // 32MB
            fuel_per_call: 500_000_000,
        }
    }
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub limits: ExecutionLimits,
    pub sandbox: SandboxLimits,
    /// Variables exposed through the `environment` host import.
    pub environment: HashMap<String, String>,
    /// Cache compiled components next to their `.wasm` files.
    pub cache_compiled: bool,
    /// Default `User-Agent` for outbound requests made by components.
    pub user_agent: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            limits: ExecutionLimits::default(),
            sandbox: SandboxLimits::default(),
            environment: HashMap::new(),
            cache_compiled: false,
            user_agent: default_user_agent(),
        }
    }
}

impl BridgeConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, BridgeError> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| BridgeError::Config(e.to_string()))?;
        file.into_config()
    }

    /// Loads configuration from `path`.
    /// Falls back to defaults with a warning when the file is missing or invalid.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No bridge config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded bridge config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse bridge config {:?}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read bridge config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.limits.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

fn default_user_agent() -> String {
    format!("AppBridge/{}", env!("CARGO_PKG_VERSION"))
}

/// Raw TOML structure matching the config file format.
#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    limits: LimitsSection,
    #[serde(default)]
    sandbox: SandboxSection,
    #[serde(default)]
    cache: CacheSection,
    #[serde(default)]
    http: HttpSection,
    #[serde(default)]
    environment: HashMap<String, String>,
}

#[derive(Deserialize, Default)]
struct LimitsSection {
    timeout_secs: Option<f64>,
    max_events: Option<usize>,
    max_store_bytes: Option<usize>,
    max_output_bytes: Option<usize>,
    cancel_grace_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct SandboxSection {
    max_memory_bytes: Option<usize>,
    fuel_per_call: Option<u64>,
}

#[derive(Deserialize, Default)]
struct CacheSection {
    #[serde(default)]
    compiled: bool,
}

#[derive(Deserialize, Default)]
struct HttpSection {
    user_agent: Option<String>,
}

impl ConfigFile {
    fn into_config(self) -> Result<BridgeConfig, BridgeError> {
        let defaults = ExecutionLimits::default();
        let timeout = match self.limits.timeout_secs {
            Some(secs) => Duration::try_from_secs_f64(secs).map_err(|e| {
                BridgeError::Config(format!("limits.timeout_secs = {secs}: {e}"))
            })?,
            None => defaults.timeout,
        };

        let sandbox_defaults = SandboxLimits::default();

        Ok(BridgeConfig {
            limits: ExecutionLimits {
                timeout,
                max_events: self.limits.max_events.unwrap_or(defaults.max_events),
                max_store_bytes: self.limits.max_store_bytes.unwrap_or(defaults.max_store_bytes),
                max_output_bytes: self
                    .limits
                    .max_output_bytes
                    .unwrap_or(defaults.max_output_bytes),
                cancel_grace: self
                    .limits
                    .cancel_grace_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.cancel_grace),
            },
            sandbox: SandboxLimits {
                max_memory_bytes: self
                    .sandbox
                    .max_memory_bytes
                    .unwrap_or(sandbox_defaults.max_memory_bytes),
                fuel_per_call: self
                    .sandbox
                    .fuel_per_call
                    .unwrap_or(sandbox_defaults.fuel_per_call),
            },
            environment: self.environment,
            cache_compiled: self.cache.compiled,
            user_agent: self.http.user_agent.unwrap_or_else(default_user_agent),
        })
    }
}
