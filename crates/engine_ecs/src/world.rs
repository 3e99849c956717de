//! ECS World: the runtime container for entities and active systems.
//!
//! A world owns an arena of entity records, the ordered list of active
//! entities, the ordered list of active systems, and the component/system
//! definitions injected from the modules it was created with. Every mutation
//! that can change which entities a system matches goes through the world,
//! which hands it to the matching code before returning.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use engine_component::{ComponentDef, Entity, EntityAllocator};
use engine_list::{EventBus, List, SubscriptionId};
use serde_json::Value;
use tracing::debug;

use crate::config::WorldConfig;
use crate::entity::EntityRecord;
use crate::error::{EcsError, SchemaError};
use crate::event::{WorldEvent, WorldEventKind};
use crate::module::{Module, SystemDef};
use crate::system::{System, SystemId};
use crate::token::UpdatePlan;

pub struct World {
    name: String,
    config: WorldConfig,
    modules: Vec<String>,
    component_defs: HashMap<String, Rc<ComponentDef>>,
    system_defs: HashMap<String, Rc<SystemDef>>,
    allocator: EntityAllocator,
    pub(crate) records: HashMap<Entity, EntityRecord>,
    pub(crate) entities: List<Entity>,
    entity_names: HashMap<String, Entity>,
    pub(crate) systems: List<SystemId>,
    pub(crate) instances: HashMap<SystemId, System>,
    system_names: HashMap<String, SystemId>,
    next_system: u64,
    events: EventBus<WorldEventKind, WorldEvent>,
    pub(crate) ticks: u64,
}

impl World {
    /// Create an empty world with no injected definitions.
    ///
    /// Worlds built this way can only activate systems through
    /// [`World::add_system_def`]; use [`Registry::world`](crate::Registry::world)
    /// to build one from modules.
    #[must_use]
    pub fn new(name: impl Into<String>, config: WorldConfig) -> Self {
        let name = name.into();
        Self {
            entities: List::with_warmup(format!("{name}.entities"), config.pool_warmup),
            systems: List::new(format!("{name}.systems")),
            name,
            config,
            modules: Vec::new(),
            component_defs: HashMap::new(),
            system_defs: HashMap::new(),
            allocator: EntityAllocator::new(),
            records: HashMap::new(),
            entity_names: HashMap::new(),
            instances: HashMap::new(),
            system_names: HashMap::new(),
            next_system: 1,
            events: EventBus::new(),
            ticks: 0,
        }
    }

    /// Make a module's definitions visible to this world.
    pub(crate) fn inject(&mut self, module: &Module) {
        self.modules.push(module.name().to_string());
        for (name, def) in module.components() {
            self.component_defs.insert(name.clone(), Rc::clone(def));
        }
        for (name, def) in module.systems() {
            self.system_defs.insert(name.clone(), Rc::clone(def));
        }
        debug!(
            world = %self.name,
            module = module.name(),
            components = self.component_defs.len(),
            systems = self.system_defs.len(),
            "module injected"
        );
    }

    /// The world's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configuration the world was created with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Names of the modules this world was built from.
    #[must_use]
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Look up an injected component definition.
    #[must_use]
    pub fn component_def(&self, name: &str) -> Option<&ComponentDef> {
        self.component_defs.get(name).map(Rc::as_ref)
    }

    /// Look up an injected system definition.
    #[must_use]
    pub fn system_def(&self, name: &str) -> Option<&SystemDef> {
        self.system_defs.get(name).map(Rc::as_ref)
    }

    /// Number of completed calls to [`World::update`].
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    // -- Entity lifecycle --

    /// Create a detached entity carrying the named components at their
    /// default values.
    ///
    /// The entity takes part in system matching only after
    /// [`World::add_entity`].
    ///
    /// # Errors
    ///
    /// Fails if a component name has no definition in this world.
    pub fn entity(
        &mut self,
        name: impl Into<String>,
        components: &[&str],
    ) -> Result<Entity, EcsError> {
        let mut record = EntityRecord::new(name.into());
        for &component in components {
            let value = self.instantiate(component, None)?;
            record.components.insert(component.to_string(), value);
        }
        let entity = self.allocator.allocate();
        debug!(world = %self.name, %entity, name = %record.name, "entity created");
        self.records.insert(entity, record);
        Ok(entity)
    }

    /// Activate a detached entity, adding it to every system it matches.
    ///
    /// # Errors
    ///
    /// Fails if the entity does not exist, is being removed, is already
    /// active, or shares its name with another active entity. A failing
    /// `$addNode` hook is returned after matching completes: the entity stays
    /// active and linked to every system it matches.
    pub fn add_entity(&mut self, entity: Entity) -> Result<Entity, EcsError> {
        let record = self
            .records
            .get(&entity)
            .filter(|record| !record.removing)
            .ok_or(EcsError::EntityNotFound(entity))?;
        if let Some(&other) = self.entity_names.get(&record.name)
            && other != entity
        {
            return Err(EcsError::DuplicateEntity(record.name.clone()));
        }
        let name = record.name.clone();

        self.entities.append(entity)?;
        self.entity_names.insert(name, entity);
        debug!(world = %self.name, %entity, "entity added");

        let matched = self.match_entity_added(entity);
        // A hook may already have removed it again.
        if self.is_active(entity) {
            self.emit(WorldEvent::EntityAdded(entity));
        }
        matched.map(|()| entity)
    }

    /// Destroy an entity, dropping it from every system first if it is
    /// active.
    ///
    /// The entity is deactivated before any `$removeNode` hook runs, so hooks
    /// still read its components but cannot match it again. A detached
    /// entity is destroyed without hooks or events.
    ///
    /// Returns `false` for an unknown handle or one whose removal is already
    /// in progress.
    ///
    /// # Errors
    ///
    /// Propagates failures from `$removeNode` hooks. The entity is destroyed
    /// regardless.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<bool, EcsError> {
        let Some(record) = self.records.get_mut(&entity) else {
            return Ok(false);
        };
        if record.removing {
            return Ok(false);
        }
        if !self.entities.remove(entity) {
            self.records.remove(&entity);
            debug!(world = %self.name, %entity, "detached entity destroyed");
            return Ok(true);
        }
        record.removing = true;
        if self.entity_names.get(&record.name) == Some(&entity) {
            self.entity_names.remove(&record.name);
        }

        let unmatched = self.match_entity_removed(entity);
        self.records.remove(&entity);
        debug!(world = %self.name, %entity, "entity removed");
        self.emit(WorldEvent::EntityRemoved(entity));
        unmatched.map(|()| true)
    }

    /// Returns `true` if the entity has been added and not removed.
    #[must_use]
    pub fn is_active(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// Returns `true` if the entity exists, active or detached.
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity)
    }

    /// The entity's name.
    #[must_use]
    pub fn entity_name(&self, entity: Entity) -> Option<&str> {
        self.records.get(&entity).map(|r| r.name.as_str())
    }

    /// Find an active entity by name.
    #[must_use]
    pub fn find_entity(&self, name: &str) -> Option<Entity> {
        self.entity_names.get(name).copied()
    }

    /// The live list of active entities, in activation order.
    #[must_use]
    pub fn entities(&self) -> &List<Entity> {
        &self.entities
    }

    // -- Component operations --

    /// Attach a component, instantiated from its definition with `overrides`
    /// applied.
    ///
    /// On an active entity this may add it to systems it now matches. If the
    /// entity already carries the component, the data is replaced and no
    /// membership changes.
    ///
    /// # Errors
    ///
    /// Fails for an unknown entity or component, or malformed overrides.
    pub fn add_component(
        &mut self,
        entity: Entity,
        component: &str,
        overrides: Option<Value>,
    ) -> Result<(), EcsError> {
        let value = self.instantiate(component, overrides.as_ref())?;
        let record = self
            .records
            .get_mut(&entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        let replaced = record
            .components
            .insert(component.to_string(), value)
            .is_some();
        debug!(world = %self.name, %entity, component, replaced, "component added");

        if !replaced && self.entities.contains(&entity) {
            self.match_component_added(entity, component)?;
        }
        Ok(())
    }

    /// Detach a component and return its data.
    ///
    /// On an active entity, systems requiring the component drop the entity
    /// first; their `$removeNode` hooks still see the component. If a hook
    /// destroys the entity, the data as it was before the hooks is returned.
    ///
    /// # Errors
    ///
    /// Fails if the entity does not exist or does not carry the component.
    /// A failing `$removeNode` hook is returned after the component is gone.
    pub fn remove_component(&mut self, entity: Entity, component: &str) -> Result<Value, EcsError> {
        let record = self
            .records
            .get(&entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        let Some(before) = record.components.get(component).cloned() else {
            return Err(EcsError::ComponentNotFound(component.to_string(), entity));
        };

        let unmatched = if self.entities.contains(&entity) {
            self.match_component_removed(entity, component)
        } else {
            Ok(())
        };

        let value = self
            .records
            .get_mut(&entity)
            .and_then(|record| record.components.remove(component))
            .unwrap_or(before);
        debug!(world = %self.name, %entity, component, "component removed");
        unmatched.map(|()| value)
    }

    /// Read a component.
    #[must_use]
    pub fn component(&self, entity: Entity, component: &str) -> Option<&Value> {
        self.records.get(&entity)?.components.get(component)
    }

    /// Mutate a component's data in place.
    pub fn component_mut(&mut self, entity: Entity, component: &str) -> Option<&mut Value> {
        self.records.get_mut(&entity)?.components.get_mut(component)
    }

    /// Returns `true` if the entity carries the component.
    #[must_use]
    pub fn has_component(&self, entity: Entity, component: &str) -> bool {
        self.records.get(&entity).is_some_and(|r| r.has(component))
    }

    /// The names of the entity's components, sorted.
    #[must_use]
    pub fn component_names(&self, entity: Entity) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .records
            .get(&entity)
            .map(|r| r.components.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    fn instantiate(&self, component: &str, overrides: Option<&Value>) -> Result<Value, EcsError> {
        let def = self
            .component_defs
            .get(component)
            .ok_or_else(|| EcsError::UnknownComponent {
                world: self.name.clone(),
                component: component.to_string(),
            })?;
        Ok(def.instantiate(overrides)?)
    }

    // -- System lifecycle --

    /// Activate the system defined under `name` in one of this world's
    /// modules.
    ///
    /// # Errors
    ///
    /// Fails if no such definition is visible, the name is already active,
    /// an update token cannot be resolved, or a hook fails.
    pub fn add_system(&mut self, name: &str) -> Result<SystemId, EcsError> {
        let def = self
            .system_defs
            .get(name)
            .cloned()
            .ok_or_else(|| EcsError::UnknownSystem {
                world: self.name.clone(),
                system: name.to_string(),
            })?;
        self.activate(name, def)
    }

    /// Activate a system from a definition that did not come from a module.
    ///
    /// # Errors
    ///
    /// Same as [`World::add_system`], minus the definition lookup.
    pub fn add_system_def(&mut self, name: &str, def: SystemDef) -> Result<SystemId, EcsError> {
        self.activate(name, Rc::new(def))
    }

    fn activate(&mut self, name: &str, def: Rc<SystemDef>) -> Result<SystemId, EcsError> {
        if name.is_empty() {
            return Err(SchemaError::EmptyName("system").into());
        }
        if self.system_names.contains_key(name) {
            return Err(EcsError::SystemAlreadyActive(name.to_string()));
        }
        let plan = match &def.update {
            Some(spec) => Some(UpdatePlan::resolve(name, spec, &def.require, |other| {
                other == name
                    || self.system_defs.contains_key(other)
                    || self.system_names.contains_key(other)
            })?),
            None => None,
        };

        let id = SystemId(self.next_system);
        self.next_system += 1;
        let system = System::new(id, name, def, plan, self.config.pool_warmup);
        self.instances.insert(id, system);
        self.system_names.insert(name.to_string(), id);
        self.systems.append(id)?;
        debug!(world = %self.name, system = name, %id, "system activated");

        let matched = self.match_system_added(id);
        if self.instances.contains_key(&id) {
            self.emit(WorldEvent::SystemAdded(id));
        }
        matched.map(|()| id)
    }

    /// Deactivate a system: drain its `$nodes`, run `$removed`, and hand the
    /// drained instance back.
    ///
    /// Returns `None` if the system is not active or its removal is already
    /// in progress.
    ///
    /// # Errors
    ///
    /// Propagates hook failures. The system is deactivated regardless.
    pub fn remove_system(&mut self, id: SystemId) -> Result<Option<System>, EcsError> {
        let Some(system) = self.instances.get_mut(&id) else {
            return Ok(None);
        };
        if system.removing {
            return Ok(None);
        }
        system.removing = true;
        let drained = self.match_system_removed(id);

        self.systems.remove(id);
        let system = self.instances.remove(&id);
        if let Some(system) = &system {
            self.system_names.remove(system.name());
        }
        debug!(world = %self.name, %id, "system deactivated");
        self.emit(WorldEvent::SystemRemoved(id));
        drained.map(|()| system)
    }

    /// Deactivate a system by name.
    ///
    /// # Errors
    ///
    /// See [`World::remove_system`].
    pub fn remove_system_by_name(&mut self, name: &str) -> Result<Option<System>, EcsError> {
        match self.system_id(name) {
            Some(id) => self.remove_system(id),
            None => Ok(None),
        }
    }

    /// Returns `true` if a system named `name` is active.
    #[must_use]
    pub fn is_use(&self, name: &str) -> bool {
        self.system_names.contains_key(name)
    }

    /// The active system named `name`.
    #[must_use]
    pub fn system_id(&self, name: &str) -> Option<SystemId> {
        self.system_names.get(name).copied()
    }

    /// An active system.
    #[must_use]
    pub fn system(&self, id: SystemId) -> Option<&System> {
        self.instances.get(&id)
    }

    /// An active system, mutably (for its state and `$nodes` observers).
    pub fn system_mut(&mut self, id: SystemId) -> Option<&mut System> {
        self.instances.get_mut(&id)
    }

    /// An active system, or [`EcsError::SystemNotActive`].
    ///
    /// # Errors
    ///
    /// Fails if the system is not active.
    pub fn try_system(&self, id: SystemId) -> Result<&System, EcsError> {
        self.system(id).ok_or(EcsError::SystemNotActive(id))
    }

    /// The live list of active systems, in activation order.
    #[must_use]
    pub fn systems(&self) -> &List<SystemId> {
        &self.systems
    }

    // -- Lifecycle events --

    /// Observe entity/system lifecycle events.
    pub fn subscribe<F>(&mut self, kind: WorldEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&WorldEvent) + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    /// Stop observing lifecycle events.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.events.unsubscribe(subscription)
    }

    fn emit(&mut self, event: WorldEvent) {
        self.events.trigger(event.kind(), &event);
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("name", &self.name)
            .field("modules", &self.modules)
            .field("entities", &self.entities.len())
            .field("systems", &self.systems.len())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}
