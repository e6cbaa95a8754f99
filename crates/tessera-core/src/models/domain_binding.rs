//! Domain binding domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maps a DNS hostname to exactly one project.
///
/// Only verified bindings participate in request-time tenant
/// resolution; an unverified binding is inert until the external
/// verification process flips [`DomainBinding::verified`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBinding {
    pub id: Uuid,
    /// The bound hostname, stored lowercase (e.g., `acme.example.com`).
    /// Globally unique.
    pub domain: String,
    pub project_id: Uuid,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to add a custom domain. Bindings always start
/// unverified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDomainBinding {
    pub domain: String,
    pub project_id: Uuid,
}
