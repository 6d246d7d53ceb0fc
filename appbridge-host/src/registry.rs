//! Load-time capability registry.

use crate::engine::ComponentInstance;
use crate::error::LoadError;
use crate::translate::describe;
use appbridge_types::CapabilityKind;
use std::collections::BTreeSet;

/// The trigger and action ids a component exposed when it was loaded.
///
/// Built once per handle; ids never change for the handle's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityRegistry {
    triggers: BTreeSet<String>,
    actions: BTreeSet<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an id, failing if the same kind already holds it.
    pub fn insert(&mut self, kind: CapabilityKind, id: impl Into<String>) -> Result<(), LoadError> {
        let id = id.into();
        let set = match kind {
            CapabilityKind::Trigger => &mut self.triggers,
            CapabilityKind::Action => &mut self.actions,
        };
        if set.contains(&id) {
            return Err(LoadError::DuplicateCapability { kind, id });
        }
        set.insert(id);
        Ok(())
    }

    pub fn from_ids(
        triggers: impl IntoIterator<Item = String>,
        actions: impl IntoIterator<Item = String>,
    ) -> Result<Self, LoadError> {
        let mut registry = Self::new();
        for id in triggers {
            registry.insert(CapabilityKind::Trigger, id)?;
        }
        for id in actions {
            registry.insert(CapabilityKind::Action, id)?;
        }
        Ok(registry)
    }

    /// Asks a freshly loaded instance for its capabilities.
    pub fn enumerate(instance: &mut dyn ComponentInstance) -> Result<Self, LoadError> {
        let triggers = instance.trigger_ids().map_err(|e| LoadError::Enumeration {
            message: format!("trigger-ids: {}", describe(&e)),
        })?;
        let actions = instance.action_ids().map_err(|e| LoadError::Enumeration {
            message: format!("action-ids: {}", describe(&e)),
        })?;
        Self::from_ids(triggers, actions)
    }

    #[must_use]
    pub fn contains(&self, kind: CapabilityKind, id: &str) -> bool {
        match kind {
            CapabilityKind::Trigger => self.triggers.contains(id),
            CapabilityKind::Action => self.actions.contains(id),
        }
    }

    /// Trigger ids in sorted order.
    pub fn trigger_ids(&self) -> Vec<String> {
        self.triggers.iter().cloned().collect()
    }

    /// Action ids in sorted order.
    pub fn action_ids(&self) -> Vec<String> {
        self.actions.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_allowed_across_kinds() {
        let registry =
            CapabilityRegistry::from_ids(vec!["sync".into()], vec!["sync".into()]).unwrap();
        assert!(registry.contains(CapabilityKind::Trigger, "sync"));
        assert!(registry.contains(CapabilityKind::Action, "sync"));
    }

    #[test]
    fn duplicate_trigger_is_fatal() {
        let err = CapabilityRegistry::from_ids(
            vec!["new-posts".into(), "new-posts".into()],
            Vec::<String>::new(),
        )
        .unwrap_err();
        match err {
            LoadError::DuplicateCapability { kind, id } => {
                assert_eq!(kind, CapabilityKind::Trigger);
                assert_eq!(id, "new-posts");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ids_are_sorted() {
        let registry = CapabilityRegistry::from_ids(
            vec!["new-todos".into(), "new-albums".into()],
            vec!["http-post".into(), "http-get".into()],
        )
        .unwrap();
        assert_eq!(registry.trigger_ids(), vec!["new-albums", "new-todos"]);
        assert_eq!(registry.action_ids(), vec!["http-get", "http-post"]);
    }

    #[test]
    fn unknown_id_not_contained() {
        let registry = CapabilityRegistry::new();
        assert!(!registry.contains(CapabilityKind::Trigger, "missing"));
    }
}
