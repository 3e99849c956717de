//! Arena record behind an [`Entity`](engine_component::Entity) handle.
//!
//! Components are dynamic: each is an owned JSON object keyed by its
//! component type name.

use std::collections::HashMap;

use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub(crate) struct EntityRecord {
    pub(crate) name: String,
    pub(crate) components: HashMap<String, Value>,
    /// Set while `$removeNode` hooks run for a removal in progress.
    pub(crate) removing: bool,
}

impl EntityRecord {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            components: HashMap::new(),
            removing: false,
        }
    }

    pub(crate) fn has(&self, component: &str) -> bool {
        self.components.contains_key(component)
    }
}
