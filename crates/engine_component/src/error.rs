//! Component error types.

/// Errors raised while defining or instantiating components.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// A component was given an empty name.
    #[error("component name must not be empty")]
    EmptyName,

    /// A template's defaults are not an attribute map.
    #[error("invalid template for '{component}': {message}")]
    InvalidTemplate { component: String, message: String },

    /// Overrides passed at instantiation are not an attribute map.
    #[error("invalid overrides for '{component}': {message}")]
    InvalidOverrides { component: String, message: String },
}
