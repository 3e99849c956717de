//! Container error types.

/// Errors raised by [`List`](crate::List) mutations.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// The instance already has a node in this list.
    #[error("can't store {instance} in list '{list}': it is already linked")]
    AlreadyLinked {
        /// Name of the list that rejected the instance.
        list: String,
        /// Debug rendering of the rejected instance.
        instance: String,
    },
}
