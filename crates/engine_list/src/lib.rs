//! # engine_list
//!
//! Membership plumbing shared by every node collection in the engine.
//!
//! This crate provides:
//!
//! - [`List`] — an ordered container with O(1) append, prepend and removal by
//!   instance, tracking each member's node through a per-list link map.
//! - [`Cursor`] — traversal that captures the next member before yielding the
//!   current one, so the list may be mutated between steps.
//! - [`NodePool`] — recycles the node wrappers backing a list.
//! - [`EventBus`] — explicit subscribe/trigger notifications.

pub mod error;
pub mod events;
pub mod list;
pub mod pool;

pub use error::ListError;
pub use events::{EventBus, SubscriptionId};
pub use list::{Cursor, Iter, List, ListEvent};
pub use pool::{Node, NodeId, NodePool};
