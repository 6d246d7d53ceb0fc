//! The caller's credential/profile record.

use crate::{ContextError, Result};
use serde::{Deserialize, Serialize};

/// An account or connection the caller acts on behalf of.
///
/// The bridge never interprets `serialized_profile`; only the component
/// parses it (for example to unlock premium schema fields). Fields are
/// private so an `Identity` cannot change once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    id: String,
    name: String,
    #[serde(default)]
    serialized_profile: String,
}

impl Identity {
    /// Builds an identity, rejecting an empty `id` or `name`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        serialized_profile: impl Into<String>,
    ) -> Result<Self> {
        let identity = Self {
            id: id.into(),
            name: name.into(),
            serialized_profile: serialized_profile.into(),
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Parses an identity from its JSON form (`{"id", "name", "serialized_profile"}`).
    pub fn from_json(json: &str) -> Result<Self> {
        let identity: Self = serde_json::from_str(json)?;
        identity.validate()?;
        Ok(identity)
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(ContextError::MissingField("identity.id"));
        }
        if self.name.is_empty() {
            return Err(ContextError::MissingField("identity.name"));
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn serialized_profile(&self) -> &str {
        &self.serialized_profile
    }
}
