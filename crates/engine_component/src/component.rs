//! Component templates and instantiation.
//!
//! Components are not Rust types: a [`ComponentDef`] names a component and
//! carries its default attribute values as a JSON object. Attaching a
//! component to an entity produces an owned copy of those defaults with any
//! caller-supplied overrides applied on top.
//!
//! A template with no attributes (`null` or `{}`) is a tag component.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ComponentError;

/// Named attribute template for a component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
    name: String,
    defaults: Map<String, Value>,
}

impl ComponentDef {
    /// Create a template from a JSON object of default values.
    ///
    /// `Value::Null` is accepted and yields a tag component.
    ///
    /// # Errors
    ///
    /// Fails if `name` is empty or `defaults` is neither an object nor null.
    pub fn new(name: impl Into<String>, defaults: Value) -> Result<Self, ComponentError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ComponentError::EmptyName);
        }
        let defaults = match defaults {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ComponentError::InvalidTemplate {
                    component: name,
                    message: format!("expected object or null, found {}", kind_of(&other)),
                });
            }
        };
        Ok(Self { name, defaults })
    }

    /// The component type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The default attribute values.
    #[must_use]
    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    /// Returns `true` if the template has no attributes.
    #[must_use]
    pub fn is_tag(&self) -> bool {
        self.defaults.is_empty()
    }

    /// Produce a fresh component instance.
    ///
    /// Overrides replace defaults key by key; keys absent from the template
    /// are added as-is. `None` and `Some(Value::Null)` both mean "defaults
    /// only".
    ///
    /// # Errors
    ///
    /// Fails if `overrides` is present but not a JSON object.
    pub fn instantiate(&self, overrides: Option<&Value>) -> Result<Value, ComponentError> {
        let mut instance = self.defaults.clone();
        match overrides {
            None | Some(Value::Null) => {}
            Some(Value::Object(fields)) => {
                for (key, value) in fields {
                    instance.insert(key.clone(), value.clone());
                }
            }
            Some(other) => {
                return Err(ComponentError::InvalidOverrides {
                    component: self.name.clone(),
                    message: format!("expected object, found {}", kind_of(other)),
                });
            }
        }
        Ok(Value::Object(instance))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
