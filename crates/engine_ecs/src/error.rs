//! Error types for definitions and world mutations.

use engine_component::{ComponentError, Entity};
use engine_list::ListError;

use crate::system::{HookKind, SystemId};

/// Definition conflicts, raised while registering modules, worlds,
/// components and systems.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("module \"{0}\" has already been defined")]
    DuplicateModule(String),
    #[error("world \"{0}\" has already been defined")]
    DuplicateWorld(String),
    #[error("module \"{module}\" already defines component \"{component}\"")]
    DuplicateComponent { module: String, component: String },
    #[error("module \"{module}\" already defines system \"{system}\"")]
    DuplicateSystem { module: String, system: String },
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),
    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Runtime failures of world operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error(transparent)]
    List(#[from] ListError),
    #[error("can't find module: \"{0}\"")]
    UnknownModule(String),
    #[error("world \"{world}\" has no component \"{component}\"")]
    UnknownComponent { world: String, component: String },
    #[error("world \"{world}\" has no system \"{system}\"")]
    UnknownSystem { world: String, system: String },
    #[error("{0} not found")]
    EntityNotFound(Entity),
    #[error("component \"{0}\" not found on {1}")]
    ComponentNotFound(String, Entity),
    #[error("{0} is not active")]
    SystemNotActive(SystemId),
    #[error("system \"{0}\" is already active")]
    SystemAlreadyActive(String),
    #[error("an active entity named \"{0}\" already exists")]
    DuplicateEntity(String),
    #[error("system \"{system}\" can't resolve update token \"{token}\": {reason}")]
    UnresolvedToken {
        system: String,
        token: String,
        reason: &'static str,
    },
    #[error("system \"{system}\" failed in {hook}")]
    Callback {
        system: String,
        hook: HookKind,
        #[source]
        source: anyhow::Error,
    },
}
