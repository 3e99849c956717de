//! Active system instances.

use std::fmt;
use std::rc::Rc;

use engine_component::Entity;
use engine_list::{List, ListEvent, SubscriptionId};
use serde_json::Value;

use crate::entity::EntityRecord;
use crate::module::SystemDef;
use crate::token::UpdatePlan;

/// Handle to a system instance activated in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub(crate) u64);

impl SystemId {
    /// Returns the raw handle value.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// Which user callback was running when something failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Added,
    Removed,
    AddNode,
    RemoveNode,
    Update,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookKind::Added => "$added",
            HookKind::Removed => "$removed",
            HookKind::AddNode => "$addNode",
            HookKind::RemoveNode => "$removeNode",
            HookKind::Update => "$update",
        })
    }
}

/// A system activated in a world.
///
/// `nodes` holds exactly the world's active entities that carry every
/// required component. Only the world's matching code mutates it.
pub struct System {
    id: SystemId,
    pub(crate) name: Rc<str>,
    pub(crate) def: Rc<SystemDef>,
    pub(crate) plan: Option<Rc<UpdatePlan>>,
    pub(crate) nodes: List<Entity>,
    /// Set while `$nodes` drains and `$removed` runs.
    pub(crate) removing: bool,
    state: Value,
}

impl System {
    pub(crate) fn new(
        id: SystemId,
        name: &str,
        def: Rc<SystemDef>,
        plan: Option<UpdatePlan>,
        warmup: usize,
    ) -> Self {
        Self {
            id,
            name: Rc::from(name),
            state: def.state.clone(),
            def,
            plan: plan.map(Rc::new),
            nodes: List::with_warmup(format!("{name}.$nodes"), warmup),
            removing: false,
        }
    }

    /// This instance's handle.
    #[must_use]
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// The name the system was activated under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required component names.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.def.require
    }

    /// Returns `true` if `component` is one of the required components.
    #[must_use]
    pub fn requires(&self, component: &str) -> bool {
        self.def.require.iter().any(|r| r == component)
    }

    /// The matched-entity collection (`$nodes`).
    #[must_use]
    pub fn nodes(&self) -> &List<Entity> {
        &self.nodes
    }

    /// Per-instance state, copied from the definition's template.
    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Mutable per-instance state.
    pub fn state_mut(&mut self) -> &mut Value {
        &mut self.state
    }

    /// Returns `true` if the system declared an update.
    #[must_use]
    pub fn has_update(&self) -> bool {
        self.plan.is_some()
    }

    /// Observe entities joining or leaving `$nodes`.
    pub fn subscribe_nodes<F>(&mut self, event: ListEvent, handler: F) -> SubscriptionId
    where
        F: FnMut(&Entity) + 'static,
    {
        self.nodes.subscribe(event, handler)
    }

    /// Stop observing `$nodes`.
    pub fn unsubscribe_nodes(&mut self, subscription: SubscriptionId) -> bool {
        self.nodes.unsubscribe(subscription)
    }

    pub(crate) fn matches(&self, record: &EntityRecord) -> bool {
        self.def.require.iter().all(|c| record.has(c))
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("require", &self.def.require)
            .field("nodes", &self.nodes.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
