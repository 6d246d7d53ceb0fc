use serde::{Deserialize, Serialize};
use std::fmt;

/// The two capability kinds a component can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Trigger,
    Action,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger => f.write_str("trigger"),
            Self::Action => f.write_str("action"),
        }
    }
}

/// Which schema of a capability is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaKind {
    TriggerInput,
    TriggerOutput,
    ActionInput,
    ActionOutput,
}

impl SchemaKind {
    /// The capability kind this schema belongs to.
    #[must_use]
    pub const fn capability(self) -> CapabilityKind {
        match self {
            Self::TriggerInput | Self::TriggerOutput => CapabilityKind::Trigger,
            Self::ActionInput | Self::ActionOutput => CapabilityKind::Action,
        }
    }

    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(self, Self::TriggerInput | Self::ActionInput)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TriggerInput => "trigger-input",
            Self::TriggerOutput => "trigger-output",
            Self::ActionInput => "action-input",
            Self::ActionOutput => "action-output",
        };
        f.write_str(s)
    }
}
