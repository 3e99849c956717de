//! Registry — owns every module definition and every world built from them.
//!
//! The registry is an ordinary value held by the application. Modules are
//! registered first and filled in place; a world is then created from a list
//! of module names and receives their definitions by reference.

use std::collections::HashMap;

use tracing::info;

use crate::config::WorldConfig;
use crate::error::{EcsError, SchemaError};
use crate::module::Module;
use crate::world::World;

/// Named modules and worlds.
#[derive(Debug, Default)]
pub struct Registry {
    modules: HashMap<String, Module>,
    worlds: HashMap<String, World>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, empty module and return it for filling in.
    ///
    /// `requires` is recorded on the module; worlds list every module they
    /// need explicitly.
    ///
    /// # Errors
    ///
    /// Fails on an empty name or a name that is already registered.
    pub fn module(&mut self, name: &str, requires: &[&str]) -> Result<&mut Module, SchemaError> {
        if name.is_empty() {
            return Err(SchemaError::EmptyName("module"));
        }
        if self.modules.contains_key(name) {
            return Err(SchemaError::DuplicateModule(name.to_string()));
        }
        info!(module = name, ?requires, "module registered");
        Ok(self
            .modules
            .entry(name.to_string())
            .or_insert_with(|| Module::new(name, requires)))
    }

    /// Look up a module.
    #[must_use]
    pub fn get_module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Look up a module for further definitions.
    pub fn get_module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }

    /// Build a world from the named modules with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`Registry::world_with_config`].
    pub fn world(&mut self, name: &str, requires: &[&str]) -> Result<&mut World, EcsError> {
        self.world_with_config(name, requires, WorldConfig::default())
    }

    /// Build a world from the named modules.
    ///
    /// Components and systems of later modules shadow same-named ones of
    /// earlier modules. Nothing is registered if any step fails.
    ///
    /// # Errors
    ///
    /// Fails on an empty or already registered name, or if a required module
    /// is not registered.
    pub fn world_with_config(
        &mut self,
        name: &str,
        requires: &[&str],
        config: WorldConfig,
    ) -> Result<&mut World, EcsError> {
        if name.is_empty() {
            return Err(SchemaError::EmptyName("world").into());
        }
        if self.worlds.contains_key(name) {
            return Err(SchemaError::DuplicateWorld(name.to_string()).into());
        }

        let mut world = World::new(name, config);
        for &module_name in requires {
            let module = self
                .modules
                .get(module_name)
                .ok_or_else(|| EcsError::UnknownModule(module_name.to_string()))?;
            world.inject(module);
        }
        info!(world = name, modules = ?requires, "world registered");
        Ok(self.worlds.entry(name.to_string()).or_insert(world))
    }

    /// Look up a world.
    #[must_use]
    pub fn get_world(&self, name: &str) -> Option<&World> {
        self.worlds.get(name)
    }

    /// Look up a world for mutation and ticking.
    pub fn get_world_mut(&mut self, name: &str) -> Option<&mut World> {
        self.worlds.get_mut(name)
    }

    /// Unregister a world and hand it to the caller.
    pub fn take_world(&mut self, name: &str) -> Option<World> {
        self.worlds.remove(name)
    }

    /// Names of all registered worlds, sorted.
    #[must_use]
    pub fn world_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.worlds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Drop every module. Existing worlds keep the definitions they were
    /// built with.
    pub fn remove_all_modules(&mut self) {
        info!(count = self.modules.len(), "removing all modules");
        self.modules.clear();
    }

    /// Drop every world along with its entities and systems.
    pub fn remove_all_worlds(&mut self) {
        info!(count = self.worlds.len(), "removing all worlds");
        self.worlds.clear();
    }
}
