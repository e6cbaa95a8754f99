//! Project (tenant) domain model.
//!
//! A project is the isolation unit of multi-tenancy: every customer,
//! campaign, and domain binding belongs to exactly one project, and
//! every request is resolved to one before any policy check runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An isolated tenant instance of the platform.
///
/// Projects are never hard-deleted: historical role assignments and
/// audit records reference them, so deactivation flips [`Project::active`]
/// instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    /// The organization that owns this project.
    pub organization_id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// URL-safe globally unique identifier (e.g., `acme-rewards`).
    pub slug: String,
    /// Inactive projects are invisible to public traffic.
    pub active: bool,
    /// Opaque theme/branding document; the core never inspects it.
    pub theme: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to provision a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub theme: Option<serde_json::Value>,
}

/// Fields a tenant admin may change on an existing project.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub theme: Option<serde_json::Value>,
}

/// Named asymmetry for id-based lookups.
///
/// Public traffic must never see an inactive project, but the owner's
/// dashboard still needs to load it to reactivate or inspect it. The
/// distinction is deliberate and explicit, never an accidental filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectLookup {
    /// Storefront traffic: inactive projects resolve to not-found.
    Public,
    /// Dashboard/administrative traffic: the active flag is bypassed.
    Admin,
}
