//! Per-tick update dispatch.

use std::rc::Rc;

use engine_component::Entity;
use tracing::{debug, debug_span};

use crate::error::EcsError;
use crate::system::{HookKind, SystemId};
use crate::token::UpdatePlan;
use crate::world::World;

impl World {
    /// Run one tick: every active system's update, in activation order.
    ///
    /// A system whose update declares `$node` is invoked once per entity in
    /// its `$nodes`, in list order; any other update is invoked exactly once.
    /// Callbacks may mutate the world freely. The systems and each `$nodes`
    /// sweep are snapshotted up front: a system or entity removed mid-tick is
    /// skipped, one added mid-tick runs from the next tick on.
    ///
    /// # Errors
    ///
    /// The first failing callback aborts the rest of the tick and is
    /// returned as [`EcsError::Callback`].
    pub fn update(&mut self, time: f64) -> Result<(), EcsError> {
        let tick = self.ticks + 1;
        let span = debug_span!("tick", world = %self.name(), tick);
        let _enter = span.enter();

        let mut invocations = 0;
        for id in self.systems.to_vec() {
            invocations += self.dispatch(id, time)?;
        }

        self.ticks = tick;
        debug!(systems = self.systems.len(), invocations, "tick dispatched");
        Ok(())
    }

    fn dispatch(&mut self, id: SystemId, time: f64) -> Result<usize, EcsError> {
        let Some(system) = self.instances.get(&id) else {
            return Ok(0);
        };
        let Some(plan) = system.plan.clone() else {
            return Ok(0);
        };
        let name = Rc::clone(&system.name);

        if !plan.per_node() {
            self.invoke(&plan, &name, id, time, None)?;
            return Ok(1);
        }

        let mut calls = 0;
        for entity in system.nodes.to_vec() {
            let Some(system) = self.instances.get(&id) else {
                break;
            };
            if !system.nodes.contains(&entity) {
                continue;
            }
            self.invoke(&plan, &name, id, time, Some(entity))?;
            calls += 1;
        }
        Ok(calls)
    }

    fn invoke(
        &mut self,
        plan: &UpdatePlan,
        name: &str,
        id: SystemId,
        time: f64,
        node: Option<Entity>,
    ) -> Result<(), EcsError> {
        let args = plan.bind(self, id, time, node);
        (plan.callback)(self, &args).map_err(|source| EcsError::Callback {
            system: name.to_string(),
            hook: HookKind::Update,
            source,
        })
    }
}
