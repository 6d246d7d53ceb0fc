//! Helpers behind the `appbridge` binary: reading identities, inputs and
//! configuration from the command line, and rendering results.

use anyhow::{Context, Result, bail};
use appbridge_host::{ActionResponse, BridgeConfig, Identity, TriggerResponse};
use serde::Serialize;
use std::path::Path;

/// Identity used when no `--identity` file is given.
pub const CLI_IDENTITY_ID: &str = "appbridge-cli";
pub const CLI_IDENTITY_NAME: &str = "AppBridge CLI";

/// Reads configuration strictly: a named file that fails to parse is an
/// error, unlike the host's lenient `load_from`.
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let Some(path) = path else {
        return Ok(BridgeConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    BridgeConfig::from_toml_str(&contents).with_context(|| format!("parsing config {}", path.display()))
}

pub fn load_identity(path: Option<&Path>) -> Result<Identity> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading identity {}", path.display()))?;
            Identity::from_json(&json).with_context(|| format!("parsing identity {}", path.display()))
        }
        None => Identity::new(CLI_IDENTITY_ID, CLI_IDENTITY_NAME, "{}").context("building CLI identity"),
    }
}

/// Resolves `--input`: `@path` reads a file, anything else is literal JSON.
/// The result must parse as JSON; `None` yields an empty object.
pub fn read_input(arg: Option<&str>) -> Result<String> {
    let raw = match arg {
        None => return Ok("{}".to_string()),
        Some(arg) => match arg.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading input {path}"))?,
            None => arg.to_string(),
        },
    };
    if raw.trim().is_empty() {
        return Ok("{}".to_string());
    }
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&raw) {
        bail!("input is not valid JSON: {e}");
    }
    Ok(raw)
}

#[derive(Serialize)]
struct Capabilities<'a> {
    app: &'a str,
    triggers: Vec<String>,
    actions: Vec<String>,
}

pub fn render_capabilities(app: &str, triggers: Vec<String>, actions: Vec<String>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Capabilities { app, triggers, actions })?)
}

pub fn render_trigger_response(response: &TriggerResponse) -> Result<String> {
    Ok(serde_json::to_string_pretty(response)?)
}

pub fn render_action_response(response: &ActionResponse) -> Result<String> {
    Ok(serde_json::to_string_pretty(response)?)
}

/// Returns the schema exactly as the component produced it. With `pretty`,
/// JSON schemas are re-indented; anything else is still left untouched.
pub fn render_schema(schema: &str, pretty: bool) -> String {
    if !pretty {
        return schema.to_string();
    }
    serde_json::from_str::<serde_json::Value>(schema)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| schema.to_string())
}
