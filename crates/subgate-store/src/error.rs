//! Store error types.

/// Error produced by record store and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists under the targeted token.
    #[error("customer not found")]
    NotFound,

    /// Token collision on create or rotate.
    #[error("token already exists")]
    Conflict,

    /// An override must set at least one of primary or backup.
    #[error("override must set at least one of primary or backup")]
    EmptyOverride,

    /// Lock acquisition timed out (only with a configured lock timeout).
    #[error("store busy: could not acquire lock")]
    Busy,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize: {0}")]
    Serialize(#[from] serde_yaml::Error),
}
