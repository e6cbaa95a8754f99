//! Error types for the Tessera system.
//!
//! The variants mirror the user-facing status semantics one-to-one:
//! stores and the policy engine return these typed outcomes and never
//! swallow them; the authorization gate is the single place that maps
//! them to response statuses via [`TesseraError::status_code`].

use thiserror::Error;
use uuid::Uuid;

use crate::policy::{Action, ResourceType};

#[derive(Debug, Error)]
pub enum TesseraError {
    /// No verified domain binding, or the project is inactive. Never
    /// coerced into a default tenant.
    #[error("tenant not found: {lookup}")]
    TenantNotFound { lookup: String },

    /// Missing or invalid credential on a route that requires one.
    #[error("authentication required: {reason}")]
    Unauthenticated { reason: String },

    /// Credential valid, but the subject's role lacks the permission.
    /// Carries the denied (resource, action) pair for audit logging;
    /// nothing tenant-data-bearing.
    #[error("access denied: {action} on {resource}")]
    Forbidden {
        resource: ResourceType,
        action: Action,
    },

    /// The mutation would leave the scope without an owner.
    #[error("cannot remove the last owner of scope {scope_id}")]
    LastOwnerProtection { scope_id: Uuid },

    /// Transient data-store failure. Retryable; must never be reported
    /// as a denial or a not-found.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Transient identity-provider failure. Retryable; must never be
    /// reported as a denial.
    #[error("auth provider unavailable: {0}")]
    AuthProviderUnavailable(String),

    /// Malformed input to a mutation (bad slug, unknown role value...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A non-tenant entity lookup came up empty.
    #[error("entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Uniqueness violation on create (slug, domain, external id).
    #[error("entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl TesseraError {
    /// HTTP-style status the transport layer should surface for this
    /// outcome. Kept here so no route handler re-derives the mapping.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TenantNotFound { .. } | Self::NotFound { .. } => 404,
            Self::Unauthenticated { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::LastOwnerProtection { .. } | Self::AlreadyExists { .. } => 409,
            Self::Validation { .. } => 400,
            Self::StoreUnavailable(_) | Self::AuthProviderUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Whether a caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::AuthProviderUnavailable(_)
        )
    }
}

pub type TesseraResult<T> = Result<T, TesseraError>;
