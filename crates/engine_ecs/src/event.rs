//! World lifecycle notifications.

use engine_component::Entity;

use crate::system::SystemId;

/// Kinds of lifecycle events a world emits, used as subscription keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldEventKind {
    EntityAdded,
    EntityRemoved,
    SystemAdded,
    SystemRemoved,
}

/// A lifecycle event emitted after the corresponding mutation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    EntityAdded(Entity),
    EntityRemoved(Entity),
    SystemAdded(SystemId),
    SystemRemoved(SystemId),
}

impl WorldEvent {
    /// The subscription key for this event.
    #[must_use]
    pub fn kind(&self) -> WorldEventKind {
        match self {
            WorldEvent::EntityAdded(_) => WorldEventKind::EntityAdded,
            WorldEvent::EntityRemoved(_) => WorldEventKind::EntityRemoved,
            WorldEvent::SystemAdded(_) => WorldEventKind::SystemAdded,
            WorldEvent::SystemRemoved(_) => WorldEventKind::SystemRemoved,
        }
    }
}
