//! # engine_component
//!
//! The "E" and "C" in ECS — entity handles and the data records attached to
//! them.
//!
//! This crate provides:
//!
//! - [`Entity`] — a lightweight `u64` handle into a world's entity arena.
//! - [`EntityAllocator`] — monotonically increasing handle allocator.
//! - [`ComponentDef`] — a named attribute template (default field values).
//! - [`ComponentError`] — template and override validation failures.
//!
//! Component data is dynamic: an instance is a JSON object produced by
//! [`ComponentDef::instantiate`], starting from the template's defaults and
//! overlaid with caller-supplied overrides.

pub mod component;
pub mod entity;
pub mod error;

pub use component::ComponentDef;
pub use entity::{Entity, EntityAllocator};
pub use error::ComponentError;
