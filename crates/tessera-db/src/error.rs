//! Database-specific error types and conversions.
//!
//! The conversion into [`TesseraError`] is where the fail-closed
//! taxonomy is enforced at the store boundary: a driver/transport
//! failure becomes `StoreUnavailable` (retryable, 5xx), while an
//! absent row becomes the appropriate not-found variant. The two are
//! never conflated, so an outage can never masquerade as a 404 or a
//! denial.

use tessera_core::error::TesseraError;
use uuid::Uuid;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("No tenant for {lookup}")]
    TenantNotFound { lookup: String },

    #[error("Scope {scope_id} would be left without an owner")]
    LastOwner { scope_id: Uuid },

    #[error("Duplicate record: {entity}")]
    Duplicate { entity: String },

    #[error("Transaction conflict: {0}")]
    Conflict(String),
}

impl From<DbError> for TesseraError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => TesseraError::NotFound { entity, id },
            DbError::TenantNotFound { lookup } => TesseraError::TenantNotFound { lookup },
            DbError::LastOwner { scope_id } => TesseraError::LastOwnerProtection { scope_id },
            DbError::Duplicate { entity } => TesseraError::AlreadyExists { entity },
            DbError::Migration(msg) => TesseraError::Internal(msg),
            DbError::Surreal(e) => TesseraError::StoreUnavailable(e.to_string()),
            // A conflict that survives its retries is a transient
            // store condition, so it keeps the retryable status.
            DbError::Conflict(msg) => TesseraError::StoreUnavailable(msg),
        }
    }
}
