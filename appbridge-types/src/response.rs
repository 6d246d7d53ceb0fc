//! Values a component returns from a successful invocation.

use serde::{Deserialize, Serialize};

/// One event in a trigger batch.
///
/// `id` only has to be unique inside its batch; callers use it to
/// deduplicate redelivered events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub id: String,
    pub serialized_data: String,
}

impl TriggerEvent {
    pub fn new(id: impl Into<String>, serialized_data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            serialized_data: serialized_data.into(),
        }
    }
}

/// Result of one trigger poll.
///
/// `events` is in delivery order. `store` is always a string, even when a
/// component happens to use numeric offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub store: String,
    pub events: Vec<TriggerEvent>,
}

impl TriggerResponse {
    pub fn new(store: impl Into<String>, events: Vec<TriggerEvent>) -> Self {
        Self {
            store: store.into(),
            events,
        }
    }

    /// Raw byte length of the cursor, the unit the store ceiling is measured in.
    #[must_use]
    pub fn store_len(&self) -> usize {
        self.store.len()
    }
}

/// Result of one action execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub serialized_output: String,
}

impl ActionResponse {
    pub fn new(serialized_output: impl Into<String>) -> Self {
        Self {
            serialized_output: serialized_output.into(),
        }
    }
}
