//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and return typed outcomes from
//! the core taxonomy — a missing row is a not-found variant, a driver
//! failure is [`TesseraError::StoreUnavailable`], and the two are never
//! conflated.
//!
//! Subject/scope parameter order is canonical everywhere:
//! `(user_id, scope_id)`.

use uuid::Uuid;

use crate::error::TesseraResult;
use crate::models::{
    domain_binding::{CreateDomainBinding, DomainBinding},
    organization::{CreateOrganization, Organization},
    project::{CreateProject, Project, ProjectLookup, UpdateProject},
    role_assignment::RoleAssignment,
    user::User,
};
use crate::policy::Role;

// ---------------------------------------------------------------------------
// Tenant directory
// ---------------------------------------------------------------------------

/// Read-side tenant resolution plus the administrative project
/// mutations that feed it.
///
/// `resolve_by_domain` only consults **verified** domain bindings and
/// **active** projects; an unverified binding or a deactivated project
/// yields `TenantNotFound`, never a stale record.
pub trait ProjectRepository: Send + Sync {
    fn create(&self, input: CreateProject) -> impl Future<Output = TesseraResult<Project>> + Send;

    /// Resolve the tenant for an incoming hostname. Public semantics:
    /// verified bindings and active projects only.
    fn resolve_by_domain(
        &self,
        hostname: &str,
    ) -> impl Future<Output = TesseraResult<Project>> + Send;

    /// Resolve by slug. Public semantics: active projects only.
    fn resolve_by_slug(&self, slug: &str) -> impl Future<Output = TesseraResult<Project>> + Send;

    /// Resolve by id. [`ProjectLookup::Admin`] bypasses the active
    /// filter; [`ProjectLookup::Public`] does not.
    fn resolve_by_id(
        &self,
        id: Uuid,
        lookup: ProjectLookup,
    ) -> impl Future<Output = TesseraResult<Project>> + Send;

    fn update(
        &self,
        id: Uuid,
        input: UpdateProject,
    ) -> impl Future<Output = TesseraResult<Project>> + Send;

    /// Soft-deactivate (or reactivate). Projects are never hard-deleted.
    fn set_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = TesseraResult<Project>> + Send;
}

/// Domain binding lifecycle. The verification flip itself is driven by
/// an external process; the repository only records its outcome.
pub trait DomainBindingRepository: Send + Sync {
    /// Add a binding; always starts unverified.
    fn add(
        &self,
        input: CreateDomainBinding,
    ) -> impl Future<Output = TesseraResult<DomainBinding>> + Send;

    /// Record a successful external verification.
    fn mark_verified(
        &self,
        domain: &str,
    ) -> impl Future<Output = TesseraResult<DomainBinding>> + Send;

    fn remove(&self, domain: &str) -> impl Future<Output = TesseraResult<()>> + Send;

    fn list_for_project(
        &self,
        project_id: Uuid,
    ) -> impl Future<Output = TesseraResult<Vec<DomainBinding>>> + Send;
}

// ---------------------------------------------------------------------------
// Organizations & users
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = TesseraResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TesseraResult<Organization>> + Send;
    fn get_by_slug(&self, slug: &str)
    -> impl Future<Output = TesseraResult<Organization>> + Send;
}

pub trait UserRepository: Send + Sync {
    /// Mirror an externally authenticated subject into the local store.
    /// Exactly one local user per external identity; repeated calls for
    /// the same external id return the same record (email refreshed).
    fn get_or_create_by_external_id(
        &self,
        external_id: &str,
        email: &str,
    ) -> impl Future<Output = TesseraResult<User>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TesseraResult<User>> + Send;

    fn get_by_external_id(
        &self,
        external_id: &str,
    ) -> impl Future<Output = TesseraResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// Policy store
// ---------------------------------------------------------------------------

/// Persisted role assignments per (user, scope).
pub trait RoleAssignmentRepository: Send + Sync {
    fn list_assignments(
        &self,
        scope_id: Uuid,
    ) -> impl Future<Output = TesseraResult<Vec<RoleAssignment>>> + Send;

    /// The user's effective role in the scope, if any.
    fn get_role(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
    ) -> impl Future<Output = TesseraResult<Option<Role>>> + Send;

    /// Idempotent upsert: re-assigning the same (user, scope, role) is
    /// a no-op; a different role replaces the existing one.
    fn assign_role(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
        role: Role,
    ) -> impl Future<Output = TesseraResult<RoleAssignment>> + Send;

    /// Remove an assignment. Must be atomic with its own owner-count
    /// read: revoking the last `Owner` of a scope fails with
    /// `LastOwnerProtection` even under concurrent revokes.
    fn revoke_role(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
        role: Role,
    ) -> impl Future<Output = TesseraResult<()>> + Send;
}
