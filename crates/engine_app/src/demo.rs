//! Demo content: a small kinematics module.
//!
//! Particles carry a position, a velocity and a lifetime. `movement`
//! integrates positions, `aging` removes particles whose lifetime ran out
//! (from inside its own sweep), and `census` tracks how many particles are
//! alive.

use anyhow::{Context, bail};
use engine_component::Entity;
use engine_ecs::{Arg, Registry, SystemDef, UpdateArgs, World, WorldConfig};
use glam::Vec2;
use serde_json::{Value, json};
use tracing::{debug, info};

pub const MODULE: &str = "kinematics";
pub const WORLD: &str = "demo";

pub const POSITION: &str = "position";
pub const VELOCITY: &str = "velocity";
pub const LIFETIME: &str = "lifetime";

/// Register the kinematics module and build the demo world from it, with
/// every system active and `particles` particles spawned.
pub fn build(registry: &mut Registry, particles: usize, config: WorldConfig) -> anyhow::Result<()> {
    registry
        .module(MODULE, &[])?
        .component(POSITION, json!({"at": [0.0, 0.0]}))?
        .component(VELOCITY, json!({"per_second": [0.0, 0.0]}))?
        .component(LIFETIME, json!({"remaining": 1.0}))?
        .system("movement", movement())?
        .system("aging", aging())?
        .system("census", census())?;

    let world = registry.world_with_config(WORLD, &[MODULE], config)?;
    for system in ["movement", "aging", "census"] {
        world.add_system(system)?;
    }
    for i in 0..particles {
        spawn(world, i)?;
    }
    info!(world = WORLD, particles, "demo world ready");
    Ok(())
}

/// Spawn one particle. Later particles move faster and live longer.
pub fn spawn(world: &mut World, index: usize) -> anyhow::Result<Entity> {
    let entity = world.entity(format!("particle-{index}"), &[POSITION])?;
    let speed = index as f32 + 1.0;
    world.add_component(
        entity,
        VELOCITY,
        Some(json!({"per_second": [speed, speed * 0.5]})),
    )?;
    world.add_component(
        entity,
        LIFETIME,
        Some(json!({"remaining": 0.5 + index as f64 * 0.25})),
    )?;
    Ok(world.add_entity(entity)?)
}

fn movement() -> SystemDef {
    SystemDef::new().requires([POSITION, VELOCITY]).update(
        ["$node", POSITION, VELOCITY, "$time"],
        |world, args| {
            let dt = args.time().unwrap_or_default() as f32;
            let (entity, velocity) = component_arg(args, 2)?;
            let velocity = read_vec2(world, entity, velocity, "per_second")?;
            let (entity, position) = component_arg(args, 1)?;
            let at = read_vec2(world, entity, position, "at")? + velocity * dt;

            let data = world
                .component_mut(entity, position)
                .with_context(|| format!("{entity} lost its {position}"))?;
            data["at"] = serde_json::to_value(at)?;
            Ok(())
        },
    )
}

fn aging() -> SystemDef {
    SystemDef::new()
        .require(LIFETIME)
        .update(["$node", LIFETIME, "$time"], |world, args| {
            let (entity, lifetime) = component_arg(args, 1)?;
            let dt = args.time().unwrap_or_default();
            let data = world
                .component_mut(entity, lifetime)
                .with_context(|| format!("{entity} lost its {lifetime}"))?;
            let remaining = data["remaining"].as_f64().unwrap_or_default() - dt;
            data["remaining"] = json!(remaining);

            if remaining <= 0.0 {
                debug!(%entity, "particle expired");
                world.remove_entity(entity)?;
            }
            Ok(())
        })
}

fn census() -> SystemDef {
    SystemDef::new()
        .require(POSITION)
        .state(json!({"alive": 0, "peak": 0}))
        .on_added(|world, id| {
            let alive = world.try_system(id)?.nodes().len();
            info!(alive, "census started");
            Ok(())
        })
        .on_removed(|world, id| {
            let peak = world.try_system(id)?.state()["peak"].clone();
            info!(%peak, "census stopped");
            Ok(())
        })
        .update(["$nodes", "$world"], |world, args| {
            let Some(&Arg::Nodes(id)) = args.get(0) else {
                bail!("census expects $nodes first");
            };
            let system = world.system_mut(id).context("census is not active")?;
            let alive = system.nodes().len() as u64;
            let state = system.state_mut();
            let peak = state["peak"].as_u64().unwrap_or_default().max(alive);
            state["alive"] = json!(alive);
            state["peak"] = json!(peak);
            Ok(())
        })
}

fn component_arg(args: &UpdateArgs, index: usize) -> anyhow::Result<(Entity, &str)> {
    match args.get(index) {
        Some(Arg::Component { entity, name }) => Ok((*entity, &**name)),
        other => bail!("expected a component argument at {index}, found {other:?}"),
    }
}

fn read_vec2(world: &World, entity: Entity, component: &str, field: &str) -> anyhow::Result<Vec2> {
    let data = world
        .component(entity, component)
        .with_context(|| format!("{entity} has no {component}"))?;
    let value = data.get(field).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).with_context(|| format!("{component}.{field} is not a vec2"))
}
