//! Per-call context snapshots handed to a component.
//!
//! Contexts are built by the caller, moved into one invocation and dropped
//! when it returns. The component only ever sees a copy, so nothing it does
//! can alter the caller's identity or cursor.

use crate::{ContextError, Identity, Result};
use serde::Serialize;

/// Encoding of an empty JSON object, the default component input.
pub const EMPTY_INPUT: &str = "{}";

/// Everything a component needs to poll one trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerContext {
    trigger_id: String,
    identity: Identity,
    store: String,
    serialized_input: String,
}

impl TriggerContext {
    /// Builds a context with the default (empty object) input.
    ///
    /// `store` is the caller-held cursor from the previous poll; an empty
    /// string is a valid first-poll cursor.
    pub fn new(
        trigger_id: impl Into<String>,
        identity: Identity,
        store: impl Into<String>,
    ) -> Result<Self> {
        let trigger_id = trigger_id.into();
        if trigger_id.is_empty() {
            return Err(ContextError::MissingField("trigger_id"));
        }
        Ok(Self {
            trigger_id,
            identity,
            store: store.into(),
            serialized_input: EMPTY_INPUT.to_string(),
        })
    }

    /// Replaces the component-defined JSON input. Blank input stays `{}`.
    #[must_use]
    pub fn with_serialized_input(mut self, serialized_input: impl Into<String>) -> Self {
        self.serialized_input = non_blank(serialized_input.into());
        self
    }

    #[must_use]
    pub fn trigger_id(&self) -> &str {
        &self.trigger_id
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn store(&self) -> &str {
        &self.store
    }

    #[must_use]
    pub fn serialized_input(&self) -> &str {
        &self.serialized_input
    }
}

/// Everything a component needs to run one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionContext {
    action_id: String,
    identity: Identity,
    serialized_input: String,
}

impl ActionContext {
    pub fn new(
        action_id: impl Into<String>,
        identity: Identity,
        serialized_input: impl Into<String>,
    ) -> Result<Self> {
        let action_id = action_id.into();
        if action_id.is_empty() {
            return Err(ContextError::MissingField("action_id"));
        }
        Ok(Self {
            action_id,
            identity,
            serialized_input: non_blank(serialized_input.into()),
        })
    }

    #[must_use]
    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn serialized_input(&self) -> &str {
        &self.serialized_input
    }
}

fn non_blank(serialized_input: String) -> String {
    if serialized_input.is_empty() {
        EMPTY_INPUT.to_string()
    } else {
        serialized_input
    }
}
