//! Ledger and storage error types.

use crate::kinds::EntityKind;
use thiserror::Error;
use uuid::Uuid;

/// Result type for storage backends.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failures raised by an [`EntityStore`](crate::store::EntityStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Errors surfaced to callers of [`FleetLedger`](crate::ledger::FleetLedger).
///
/// `InvalidArgument`, `AuthenticationRequired` and `NotFound` are detected
/// before any write. `Storage` on the entity write aborts the operation;
/// a history-write failure never becomes an error (see
/// [`UpdateOutcome`](crate::ledger::UpdateOutcome)).
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("authentication required")]
    AuthenticationRequired,

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(msg.into())
    }
}
