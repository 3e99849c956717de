//! Incremental maintenance of every system's `$nodes`.
//!
//! Each world mutation touches only the systems it can affect: entity
//! changes walk the active systems once, and a system's activation scans the
//! active entities once.
//!
//! Matching runs in two phases. Membership is settled first without calling
//! any user code, then the `$addNode`/`$removeNode` hooks for the links that
//! changed run in order. Hooks get full `&mut World` access and may add or
//! remove anything, so each one fires only while its transition still holds.
//! A failing hook stops the remaining hooks but never leaves `$nodes` out of
//! step with the entities.

use std::rc::Rc;

use engine_component::Entity;
use tracing::debug;

use crate::error::EcsError;
use crate::system::{HookKind, SystemId};
use crate::world::World;

/// Membership changes whose node hooks have not run yet.
type Transitions = Vec<(SystemId, Entity)>;

impl World {
    pub(crate) fn match_entity_added(&mut self, entity: Entity) -> Result<(), EcsError> {
        let targets: Vec<SystemId> = self
            .systems
            .iter()
            .filter(|&id| self.should_link(id, entity))
            .collect();
        let linked = self.link_all(targets.into_iter().map(|id| (id, entity)))?;
        self.run_node_hooks(HookKind::AddNode, linked)
    }

    pub(crate) fn match_entity_removed(&mut self, entity: Entity) -> Result<(), EcsError> {
        let targets: Vec<SystemId> = self
            .systems
            .iter()
            .filter(|id| {
                self.instances
                    .get(id)
                    .is_some_and(|s| s.nodes.contains(&entity))
            })
            .collect();
        let unlinked = self.unlink_all(targets.into_iter().map(|id| (id, entity)));
        self.run_node_hooks(HookKind::RemoveNode, unlinked)
    }

    pub(crate) fn match_component_added(
        &mut self,
        entity: Entity,
        component: &str,
    ) -> Result<(), EcsError> {
        let targets: Vec<SystemId> = self
            .systems
            .iter()
            .filter(|id| {
                self.instances
                    .get(id)
                    .is_some_and(|s| s.requires(component))
            })
            .filter(|&id| self.should_link(id, entity))
            .collect();
        let linked = self.link_all(targets.into_iter().map(|id| (id, entity)))?;
        self.run_node_hooks(HookKind::AddNode, linked)
    }

    /// Runs while the entity still carries `component`.
    pub(crate) fn match_component_removed(
        &mut self,
        entity: Entity,
        component: &str,
    ) -> Result<(), EcsError> {
        let targets: Vec<SystemId> = self
            .systems
            .iter()
            .filter(|id| {
                self.instances
                    .get(id)
                    .is_some_and(|s| s.requires(component) && s.nodes.contains(&entity))
            })
            .collect();
        let unlinked = self.unlink_all(targets.into_iter().map(|id| (id, entity)));
        self.run_node_hooks(HookKind::RemoveNode, unlinked)
    }

    /// Initial scan for a freshly activated system, then `$added`.
    pub(crate) fn match_system_added(&mut self, id: SystemId) -> Result<(), EcsError> {
        let matched: Vec<Entity> = self
            .entities
            .iter()
            .filter(|&entity| self.should_link(id, entity))
            .collect();
        debug!(world = %self.name(), system = %id, matched = matched.len(), "initial scan complete");
        let linked = self.link_all(matched.into_iter().map(|entity| (id, entity)))?;
        self.run_node_hooks(HookKind::AddNode, linked)?;
        self.fire_system_hook(id, HookKind::Added)
    }

    /// Drains `$nodes` front to back, then `$removed`.
    pub(crate) fn match_system_removed(&mut self, id: SystemId) -> Result<(), EcsError> {
        let drained = self
            .instances
            .get(&id)
            .map(|s| s.nodes.to_vec())
            .unwrap_or_default();
        let unlinked = self.unlink_all(drained.into_iter().map(|entity| (id, entity)));
        self.run_node_hooks(HookKind::RemoveNode, unlinked)?;
        self.fire_system_hook(id, HookKind::Removed)
    }

    fn should_link(&self, id: SystemId, entity: Entity) -> bool {
        let (Some(system), Some(record)) = (self.instances.get(&id), self.records.get(&entity))
        else {
            return false;
        };
        !system.removing
            && !record.removing
            && !system.nodes.contains(&entity)
            && system.matches(record)
    }

    fn link_all(
        &mut self,
        pairs: impl IntoIterator<Item = (SystemId, Entity)>,
    ) -> Result<Transitions, EcsError> {
        let mut linked = Vec::new();
        for (id, entity) in pairs {
            let system = self
                .instances
                .get_mut(&id)
                .ok_or(EcsError::SystemNotActive(id))?;
            system.nodes.append(entity)?;
            debug!(system = %system.name, %entity, "entity matched");
            linked.push((id, entity));
        }
        Ok(linked)
    }

    fn unlink_all(&mut self, pairs: impl IntoIterator<Item = (SystemId, Entity)>) -> Transitions {
        let mut unlinked = Vec::new();
        for (id, entity) in pairs {
            let Some(system) = self.instances.get_mut(&id) else {
                continue;
            };
            if system.nodes.remove(entity) {
                debug!(system = %system.name, %entity, "entity unmatched");
                unlinked.push((id, entity));
            }
        }
        unlinked
    }

    /// Fires each transition's hook unless an earlier hook already undid it.
    fn run_node_hooks(&mut self, kind: HookKind, transitions: Transitions) -> Result<(), EcsError> {
        let linked = kind == HookKind::AddNode;
        for (id, entity) in transitions {
            let holds = self
                .instances
                .get(&id)
                .is_some_and(|s| s.nodes.contains(&entity) == linked);
            if holds {
                self.fire_node_hook(id, kind, entity)?;
            }
        }
        Ok(())
    }

    fn fire_system_hook(&mut self, id: SystemId, kind: HookKind) -> Result<(), EcsError> {
        let Some(system) = self.instances.get(&id) else {
            return Ok(());
        };
        let hook = match kind {
            HookKind::Added => system.def.added.clone(),
            HookKind::Removed => system.def.removed.clone(),
            _ => None,
        };
        let Some(hook) = hook else {
            return Ok(());
        };
        let name = Rc::clone(&system.name);
        hook(self, id).map_err(|source| EcsError::Callback {
            system: name.to_string(),
            hook: kind,
            source,
        })
    }

    fn fire_node_hook(
        &mut self,
        id: SystemId,
        kind: HookKind,
        entity: Entity,
    ) -> Result<(), EcsError> {
        let Some(system) = self.instances.get(&id) else {
            return Ok(());
        };
        let hook = match kind {
            HookKind::AddNode => system.def.add_node.clone(),
            HookKind::RemoveNode => system.def.remove_node.clone(),
            _ => None,
        };
        let Some(hook) = hook else {
            return Ok(());
        };
        let name = Rc::clone(&system.name);
        hook(self, id, entity).map_err(|source| EcsError::Callback {
            system: name.to_string(),
            hook: kind,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use crate::config::WorldConfig;
    use crate::module::SystemDef;

    use super::*;

    fn world() -> World {
        let mut registry = crate::Registry::new();
        registry
            .module("shapes", &[])
            .unwrap()
            .component("body", json!({"mass": 1.0}))
            .unwrap()
            .component("sprite", json!({"frame": 0}))
            .unwrap()
            .component("dead", serde_json::Value::Null)
            .unwrap();
        registry.world("scene", &["shapes"]).unwrap();
        registry.take_world("scene").unwrap()
    }

    fn spawn(world: &mut World, count: usize, components: &[&str]) -> Vec<Entity> {
        (0..count)
            .map(|i| {
                let e = world.entity(format!("e{i}"), components).unwrap();
                world.add_entity(e).unwrap()
            })
            .collect()
    }

    fn assert_nodes_match(world: &World) {
        for id in world.systems() {
            let system = world.system(id).unwrap();
            for e in system.nodes() {
                assert!(world.is_active(e), "{} holds inactive {e}", system.name());
            }
            for e in world.entities() {
                let expected = system.required().iter().all(|c| world.has_component(e, c));
                assert_eq!(system.nodes().contains(&e), expected, "{} / {e}", system.name());
            }
        }
    }

    #[test]
    fn test_nodes_keep_activation_order() {
        let mut world = world();
        let id = world
            .add_system_def("physics", SystemDef::new().require("body"))
            .unwrap();
        let mut expected = Vec::new();
        for i in 0..5 {
            let e = world.entity(format!("e{i}"), &["body"]).unwrap();
            world.add_entity(e).unwrap();
            expected.push(e);
        }
        // Re-attaching moves an entity to the back of $nodes.
        world.remove_component(expected[1], "body").unwrap();
        world.add_component(expected[1], "body", None).unwrap();
        let moved = expected.remove(1);
        expected.push(moved);

        assert_eq!(world.system(id).unwrap().nodes().to_vec(), expected);
    }

    #[test]
    fn test_hook_removing_entity_during_scan() {
        let mut world = world();
        let mut entities = Vec::new();
        for i in 0..3 {
            let e = world.entity(format!("e{i}"), &["body"]).unwrap();
            world.add_entity(e).unwrap();
            entities.push(e);
        }
        let victim = entities[0];
        let def = SystemDef::new()
            .require("body")
            .on_add_node(move |world, _, entity| {
                if entity == victim {
                    world.remove_entity(entity)?;
                }
                Ok(())
            });
        let id = world.add_system_def("reaper", def).unwrap();

        assert!(!world.is_active(victim));
        assert_eq!(
            world.system(id).unwrap().nodes().to_vec(),
            vec![entities[1], entities[2]]
        );
    }

    #[test]
    fn test_remove_node_hook_removing_entity_is_safe() {
        let mut world = world();
        let e = world.entity("e", &["body", "sprite"]).unwrap();
        world.add_entity(e).unwrap();
        let def = SystemDef::new()
            .require("sprite")
            .on_remove_node(|world, _, entity| {
                world.remove_entity(entity)?;
                Ok(())
            });
        let renderer = world.add_system_def("renderer", def).unwrap();
        let physics = world
            .add_system_def("physics", SystemDef::new().require("body"))
            .unwrap();

        let removed = world.remove_component(e, "sprite").unwrap();
        assert_eq!(removed, json!({"frame": 0}));
        assert!(!world.exists(e));
        assert!(world.system(renderer).unwrap().nodes().is_empty());
        assert!(world.system(physics).unwrap().nodes().is_empty());
    }

    #[test]
    fn test_add_node_hook_removing_next_entity_during_scan() {
        let mut world = world();
        let entities = spawn(&mut world, 3, &["body"]);
        let (first, second) = (entities[0], entities[1]);
        let def = SystemDef::new()
            .require("body")
            .on_add_node(move |world, _, entity| {
                if entity == first {
                    world.remove_entity(second)?;
                }
                Ok(())
            });
        let id = world.add_system_def("reaper", def).unwrap();

        assert_eq!(
            world.system(id).unwrap().nodes().to_vec(),
            vec![entities[0], entities[2]]
        );
        assert_nodes_match(&world);
    }

    #[test]
    fn test_add_node_hook_removing_next_system() {
        let mut world = world();
        let def = SystemDef::new()
            .require("body")
            .on_add_node(|world, _, _| {
                world.remove_system_by_name("b")?;
                Ok(())
            });
        let a = world.add_system_def("a", def).unwrap();
        world
            .add_system_def("b", SystemDef::new().require("body"))
            .unwrap();
        let c = world
            .add_system_def("c", SystemDef::new().require("body"))
            .unwrap();

        let e = spawn(&mut world, 1, &["body"])[0];
        assert!(!world.is_use("b"));
        assert_eq!(world.system(a).unwrap().nodes().to_vec(), vec![e]);
        assert_eq!(world.system(c).unwrap().nodes().to_vec(), vec![e]);
        assert_nodes_match(&world);
    }

    #[test]
    fn test_remove_node_hook_cannot_rematch_removed_entity() {
        let mut world = world();
        let tomb = world
            .add_system_def("tomb", SystemDef::new().require("dead"))
            .unwrap();
        let def = SystemDef::new()
            .require("body")
            .on_remove_node(|world, _, entity| {
                world.add_component(entity, "dead", None)?;
                Ok(())
            });
        let physics = world.add_system_def("physics", def).unwrap();
        let e = spawn(&mut world, 1, &["body"])[0];

        assert!(world.remove_entity(e).unwrap());
        assert!(!world.exists(e));
        assert!(world.system(tomb).unwrap().nodes().is_empty());
        assert!(world.system(physics).unwrap().nodes().is_empty());
    }

    #[test]
    fn test_nested_removal_of_entity_is_ignored() {
        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&results);
        let mut world = world();
        let def = SystemDef::new()
            .require("body")
            .on_remove_node(move |world, _, entity| {
                let removed = world.remove_entity(entity)?;
                let readded = world.add_entity(entity).is_ok();
                sink.borrow_mut().extend([removed, readded]);
                Ok(())
            });
        world.add_system_def("physics", def).unwrap();
        let e = spawn(&mut world, 1, &["body"])[0];

        assert!(world.remove_entity(e).unwrap());
        assert_eq!(*results.borrow(), vec![false, false]);
        assert!(!world.exists(e));
        assert!(world.entities().is_empty());
    }

    #[test]
    fn test_failing_add_node_still_links_every_match() {
        let mut world = world();
        let bad = world
            .add_system_def(
                "bad",
                SystemDef::new()
                    .require("body")
                    .on_add_node(|_, _, _| anyhow::bail!("rejected")),
            )
            .unwrap();
        let good = world
            .add_system_def("good", SystemDef::new().require("body"))
            .unwrap();
        let e = world.entity("e", &["body"]).unwrap();

        assert!(matches!(
            world.add_entity(e),
            Err(EcsError::Callback { hook: HookKind::AddNode, .. })
        ));
        assert!(world.is_active(e));
        assert_eq!(world.system(bad).unwrap().nodes().to_vec(), vec![e]);
        assert_eq!(world.system(good).unwrap().nodes().to_vec(), vec![e]);
        assert_nodes_match(&world);
    }

    #[test]
    fn test_failing_add_node_during_activation_links_whole_scan() {
        let mut world = world();
        let entities = spawn(&mut world, 3, &["body"]);
        let def = SystemDef::new()
            .require("body")
            .on_add_node(|_, _, _| anyhow::bail!("rejected"));

        assert!(world.add_system_def("bad", def).is_err());
        assert!(world.is_use("bad"));
        let id = world.system_id("bad").unwrap();
        assert_eq!(world.system(id).unwrap().nodes().to_vec(), entities);
        assert_nodes_match(&world);
    }

    #[test]
    fn test_system_without_requirements_matches_everything() {
        let mut world = world();
        let bare = world.entity("bare", &[]).unwrap();
        world.add_entity(bare).unwrap();
        let id = world.add_system_def("all", SystemDef::new()).unwrap();
        let body = world.entity("body", &["body"]).unwrap();
        world.add_entity(body).unwrap();

        assert_eq!(world.system(id).unwrap().nodes().to_vec(), vec![bare, body]);
    }

    #[test]
    fn test_hooks_fire_per_transition_only() {
        let counts = Rc::new(RefCell::new((0, 0)));
        let (add, remove) = (Rc::clone(&counts), Rc::clone(&counts));
        let def = SystemDef::new()
            .requires(["body", "sprite"])
            .on_add_node(move |_, _, _| {
                add.borrow_mut().0 += 1;
                Ok(())
            })
            .on_remove_node(move |_, _, _| {
                remove.borrow_mut().1 += 1;
                Ok(())
            });
        let mut world = world();
        world.add_system_def("draw", def).unwrap();
        let e = world.entity("e", &["body"]).unwrap();
        world.add_entity(e).unwrap();
        assert_eq!(*counts.borrow(), (0, 0));

        world.add_component(e, "sprite", None).unwrap();
        world.add_component(e, "sprite", Some(json!({"frame": 2}))).unwrap();
        assert_eq!(*counts.borrow(), (1, 0));

        world.remove_component(e, "body").unwrap();
        world.remove_entity(e).unwrap();
        assert_eq!(*counts.borrow(), (1, 1));
    }

    #[test]
    fn test_pool_warmup_reaches_system_nodes() {
        let mut world = World::new("w", WorldConfig::new().with_pool_warmup(4));
        let id = world.add_system_def("s", SystemDef::new()).unwrap();
        assert_eq!(world.system(id).unwrap().nodes().pool().free_count(), 4);
        assert_eq!(world.entities().pool().free_count(), 4);
    }
}
