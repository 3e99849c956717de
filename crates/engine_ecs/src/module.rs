//! Module definitions: named, reusable bundles of component and system definitions.
//!
//! A module is pure data. Worlds pick up a module's definitions when they are
//! created from a [`Registry`](crate::Registry); the module itself has no
//! runtime behaviour beyond rejecting duplicate names.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use engine_component::{ComponentDef, Entity};
use serde_json::Value;
use tracing::debug;

use crate::error::SchemaError;
use crate::system::SystemId;
use crate::token::{UpdateArgs, UpdateSpec, UpdateToken};
use crate::world::World;

/// Lifecycle callback receiving the owning world and the system's handle.
pub type SystemHook = Rc<dyn Fn(&mut World, SystemId) -> anyhow::Result<()>>;

/// Membership callback receiving the world, the system and the entity that
/// joined or left the system's `$nodes`.
pub type NodeHook = Rc<dyn Fn(&mut World, SystemId, Entity) -> anyhow::Result<()>>;

/// Per-tick callback receiving the world and the bound update arguments.
pub type UpdateFn = Rc<dyn Fn(&mut World, &UpdateArgs) -> anyhow::Result<()>>;

/// Blueprint for a system: required components, state template, hooks and
/// the update declaration.
///
/// Built with chained calls:
///
/// ```rust
/// use engine_ecs::SystemDef;
///
/// let def = SystemDef::new()
///     .require("position")
///     .require("velocity")
///     .update(["$node", "position", "velocity", "$time"], |world, args| {
///         let _ = (world, args);
///         Ok(())
///     });
/// assert_eq!(def.required(), ["position", "velocity"]);
/// ```
#[derive(Clone, Default)]
pub struct SystemDef {
    pub(crate) require: Vec<String>,
    pub(crate) state: Value,
    pub(crate) added: Option<SystemHook>,
    pub(crate) removed: Option<SystemHook>,
    pub(crate) add_node: Option<NodeHook>,
    pub(crate) remove_node: Option<NodeHook>,
    pub(crate) update: Option<UpdateSpec>,
}

impl SystemDef {
    /// An empty definition: no requirements, no hooks, no update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required component name. Duplicates are ignored.
    #[must_use]
    pub fn require(mut self, component: impl Into<String>) -> Self {
        let component = component.into();
        if !self.require.contains(&component) {
            self.require.push(component);
        }
        self
    }

    /// Add several required component names.
    #[must_use]
    pub fn requires<I, S>(self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        components.into_iter().fold(self, |def, c| def.require(c))
    }

    /// Attribute template copied into each activated instance.
    #[must_use]
    pub fn state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    /// Called once after activation, after the initial `$nodes` scan.
    #[must_use]
    pub fn on_added<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut World, SystemId) -> anyhow::Result<()> + 'static,
    {
        self.added = Some(Rc::new(hook));
        self
    }

    /// Called once on deactivation, after `$nodes` has been drained.
    #[must_use]
    pub fn on_removed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut World, SystemId) -> anyhow::Result<()> + 'static,
    {
        self.removed = Some(Rc::new(hook));
        self
    }

    /// Called whenever an entity joins `$nodes`.
    #[must_use]
    pub fn on_add_node<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut World, SystemId, Entity) -> anyhow::Result<()> + 'static,
    {
        self.add_node = Some(Rc::new(hook));
        self
    }

    /// Called whenever an entity leaves `$nodes`. The entity still carries
    /// all of its components while the hook runs.
    #[must_use]
    pub fn on_remove_node<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut World, SystemId, Entity) -> anyhow::Result<()> + 'static,
    {
        self.remove_node = Some(Rc::new(hook));
        self
    }

    /// Declare the per-tick update: an ordered token list and the callback
    /// receiving the bound arguments in that order.
    ///
    /// Recognised tokens are `$nodes`, `$node`, `$time`, `$world`, the name of
    /// a required component (with `$node`) or the name of another system.
    #[must_use]
    pub fn update<I, S, F>(mut self, tokens: I, callback: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&mut World, &UpdateArgs) -> anyhow::Result<()> + 'static,
    {
        self.update = Some(UpdateSpec {
            tokens: tokens
                .into_iter()
                .map(|t| UpdateToken::parse(t.as_ref()))
                .collect(),
            callback: Rc::new(callback),
        });
        self
    }

    /// Required component names, in declaration order.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.require
    }

    /// The state template.
    #[must_use]
    pub fn state_template(&self) -> &Value {
        &self.state
    }

    /// The declared update tokens, if the system has an update.
    #[must_use]
    pub fn update_tokens(&self) -> Option<&[UpdateToken]> {
        self.update.as_ref().map(|spec| spec.tokens.as_slice())
    }
}

impl fmt::Debug for SystemDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemDef")
            .field("require", &self.require)
            .field("state", &self.state)
            .field("added", &self.added.is_some())
            .field("removed", &self.removed.is_some())
            .field("add_node", &self.add_node.is_some())
            .field("remove_node", &self.remove_node.is_some())
            .field("update", &self.update_tokens())
            .finish()
    }
}

/// A named bundle of component and system definitions.
#[derive(Debug)]
pub struct Module {
    name: String,
    requires: Vec<String>,
    components: HashMap<String, Rc<ComponentDef>>,
    systems: HashMap<String, Rc<SystemDef>>,
}

impl Module {
    /// Create an empty module. `requires` lists the modules it builds on.
    #[must_use]
    pub fn new(name: impl Into<String>, requires: &[&str]) -> Self {
        Self {
            name: name.into(),
            requires: requires.iter().map(|r| (*r).to_string()).collect(),
            components: HashMap::new(),
            systems: HashMap::new(),
        }
    }

    /// Define a component from a JSON object of default attribute values.
    /// `Value::Null` defines a tag component.
    ///
    /// # Errors
    ///
    /// Fails on an empty name, a non-object template, or a name this module
    /// already defines.
    pub fn component(&mut self, name: &str, defaults: Value) -> Result<&mut Self, SchemaError> {
        if self.components.contains_key(name) {
            return Err(SchemaError::DuplicateComponent {
                module: self.name.clone(),
                component: name.to_string(),
            });
        }
        let def = ComponentDef::new(name, defaults)?;
        debug!(module = %self.name, component = name, "component defined");
        self.components.insert(name.to_string(), Rc::new(def));
        Ok(self)
    }

    /// Define a system.
    ///
    /// # Errors
    ///
    /// Fails on an empty name or a name this module already defines.
    pub fn system(&mut self, name: &str, def: SystemDef) -> Result<&mut Self, SchemaError> {
        if name.is_empty() {
            return Err(SchemaError::EmptyName("system"));
        }
        if self.systems.contains_key(name) {
            return Err(SchemaError::DuplicateSystem {
                module: self.name.clone(),
                system: name.to_string(),
            });
        }
        debug!(module = %self.name, system = name, require = ?def.require, "system defined");
        self.systems.insert(name.to_string(), Rc::new(def));
        Ok(self)
    }

    /// Returns `true` if this module defines a component or system `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.components.contains_key(name) || self.systems.contains_key(name)
    }

    /// The module's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the modules this one builds on.
    #[must_use]
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Look up a component definition.
    #[must_use]
    pub fn component_def(&self, name: &str) -> Option<&ComponentDef> {
        self.components.get(name).map(Rc::as_ref)
    }

    /// Look up a system definition.
    #[must_use]
    pub fn system_def(&self, name: &str) -> Option<&SystemDef> {
        self.systems.get(name).map(Rc::as_ref)
    }

    pub(crate) fn components(&self) -> impl Iterator<Item = (&String, &Rc<ComponentDef>)> {
        self.components.iter()
    }

    pub(crate) fn systems(&self) -> impl Iterator<Item = (&String, &Rc<SystemDef>)> {
        self.systems.iter()
    }
}
