//! # engine_ecs
//!
//! The runtime half of the ECS: definitions go in, live worlds come out.
//!
//! This crate provides:
//!
//! - [`Registry`] — owns named [`Module`]s and the [`World`]s built from them.
//! - [`Module`] / [`SystemDef`] — component templates and system blueprints.
//! - [`World`] — entities, active [`System`]s and the tick.
//! - Reactive matching: every entity, component or system mutation keeps each
//!   system's `$nodes` equal to the active entities carrying all of its
//!   required components.
//! - Update dispatch: [`World::update`] binds each system's declared
//!   [`UpdateToken`]s and invokes its callback once, or once per node.
//!
//! ```rust
//! use engine_ecs::{Registry, SystemDef};
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! registry
//!     .module("physics", &[])?
//!     .component("position", json!({"x": 0.0}))?
//!     .system("drift", SystemDef::new().require("position").update(
//!         ["$node", "position", "$time"],
//!         |world, args| {
//!             let (Some(entity), Some(dt)) = (args.node(), args.time()) else {
//!                 return Ok(());
//!             };
//!             if let Some(position) = world.component_mut(entity, "position") {
//!                 let x = position["x"].as_f64().unwrap_or_default();
//!                 position["x"] = json!(x + dt);
//!             }
//!             Ok(())
//!         },
//!     ))?;
//!
//! let world = registry.world("main", &["physics"])?;
//! world.add_system("drift")?;
//! let ball = world.entity("ball", &["position"])?;
//! world.add_entity(ball)?;
//! world.update(0.5)?;
//! assert_eq!(world.component(ball, "position").unwrap()["x"], 0.5);
//! # Ok::<(), engine_ecs::EcsError>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod module;
pub mod registry;
pub mod system;
pub mod token;
pub mod world;

mod dispatch;
mod entity;
mod matching;

pub use config::WorldConfig;
pub use error::{EcsError, SchemaError};
pub use event::{WorldEvent, WorldEventKind};
pub use module::{Module, NodeHook, SystemDef, SystemHook, UpdateFn};
pub use registry::Registry;
pub use system::{HookKind, System, SystemId};
pub use token::{Arg, UpdateArgs, UpdateToken};
pub use world::World;
