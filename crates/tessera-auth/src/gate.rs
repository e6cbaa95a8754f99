//! The authorization gate: the single place where policy decisions
//! become user-facing outcomes.
//!
//! Every protected operation goes through [`AccessGate::require`] or
//! the [`AccessGate::authorize`] wrapper. Handlers never re-derive
//! role checks inline; the gate resolves the acting scope, loads the
//! subject's role, consults the policy engine, and short-circuits
//! with a typed error on any failure. Role mutations pass through the
//! same gate using pre-mutation state, with a single provisioning
//! bootstrap exception for the first owner of a fresh scope.

use tessera_core::error::{TesseraError, TesseraResult};
use tessera_core::models::project::Project;
use tessera_core::models::role_assignment::RoleAssignment;
use tessera_core::policy::{Action, ResourceType, Role, is_authorized};
use tessera_core::repository::RoleAssignmentRepository;
use uuid::Uuid;

use crate::context::{RequestContext, Subject};

/// The scope a check runs against.
///
/// Console-level permissions live on the project's owning
/// organization; project-scoped grants (e.g., an external collaborator
/// on one project) live on the project itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Organization(Uuid),
    Project(Uuid),
}

impl Scope {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Organization(id) | Self::Project(id) => *id,
        }
    }
}

/// Context handed to a handler after the gate allows the request.
/// Existence of a value of this type means the check already passed.
#[derive(Debug)]
pub struct AuthorizedContext<'a> {
    pub project: &'a Project,
    pub subject: &'a Subject,
    pub role: Role,
    pub scope_id: Uuid,
}

/// The authorization gate.
pub struct AccessGate<R> {
    assignments: R,
}

impl<R: RoleAssignmentRepository> AccessGate<R> {
    pub fn new(assignments: R) -> Self {
        Self { assignments }
    }

    /// Check `(resource, action)` against the default scope: the
    /// project's owning organization.
    pub async fn require<'a>(
        &self,
        ctx: &'a RequestContext,
        resource: ResourceType,
        action: Action,
    ) -> TesseraResult<AuthorizedContext<'a>> {
        self.require_in_scope(
            ctx,
            Scope::Organization(ctx.project.organization_id),
            resource,
            action,
        )
        .await
    }

    /// Check `(resource, action)` against an explicit scope.
    ///
    /// Outcome order: missing subject → `Unauthenticated`; no role in
    /// scope or role lacks the grant → `Forbidden`; store failure
    /// propagates untouched (never coerced into a denial).
    pub async fn require_in_scope<'a>(
        &self,
        ctx: &'a RequestContext,
        scope: Scope,
        resource: ResourceType,
        action: Action,
    ) -> TesseraResult<AuthorizedContext<'a>> {
        let subject = ctx.subject.as_ref().ok_or(TesseraError::Unauthenticated {
            reason: "credential required".into(),
        })?;

        let scope_id = scope.id();
        let role = self.assignments.get_role(subject.user_id, scope_id).await?;

        let Some(role) = role else {
            tracing::warn!(
                user_id = %subject.user_id,
                scope_id = %scope_id,
                resource = %resource,
                action = %action,
                "denied: no role in scope"
            );
            return Err(TesseraError::Forbidden { resource, action });
        };

        if !is_authorized(role, resource, action) {
            tracing::warn!(
                user_id = %subject.user_id,
                scope_id = %scope_id,
                role = %role,
                resource = %resource,
                action = %action,
                "denied by policy"
            );
            return Err(TesseraError::Forbidden { resource, action });
        }

        tracing::debug!(
            user_id = %subject.user_id,
            scope_id = %scope_id,
            role = %role,
            resource = %resource,
            action = %action,
            "allowed"
        );

        Ok(AuthorizedContext {
            project: &ctx.project,
            subject,
            role,
            scope_id,
        })
    }

    /// Wrap a handler: the handler runs only if the check passes, so a
    /// denied request produces no business side effect.
    pub async fn authorize<'a, F, Fut, T>(
        &self,
        ctx: &'a RequestContext,
        resource: ResourceType,
        action: Action,
        handler: F,
    ) -> TesseraResult<T>
    where
        F: FnOnce(AuthorizedContext<'a>) -> Fut,
        Fut: Future<Output = TesseraResult<T>>,
    {
        let authorized = self.require(ctx, resource, action).await?;
        handler(authorized).await
    }

    /// Assign a role. The actor is gated on `(Member, Create)` in the
    /// target scope using pre-mutation state and may not grant a role
    /// above their own; the store-level upsert is idempotent.
    pub async fn assign_role(
        &self,
        ctx: &RequestContext,
        target_user_id: Uuid,
        scope: Scope,
        role: Role,
    ) -> TesseraResult<RoleAssignment> {
        let authorized = self
            .require_in_scope(ctx, scope, ResourceType::Member, Action::Create)
            .await?;
        self.check_seniority(&authorized, role, Action::Create)?;
        self.assignments
            .assign_role(target_user_id, authorized.scope_id, role)
            .await
    }

    /// Revoke a role. The actor is gated on `(Member, Delete)` and may
    /// not strip a role above their own; the store enforces the atomic
    /// last-owner guard, and a self-revoke that would leave the scope
    /// with no owner or admin is rejected here with the same
    /// protection.
    pub async fn revoke_role(
        &self,
        ctx: &RequestContext,
        target_user_id: Uuid,
        scope: Scope,
        role: Role,
    ) -> TesseraResult<()> {
        let authorized = self
            .require_in_scope(ctx, scope, ResourceType::Member, Action::Delete)
            .await?;
        self.check_seniority(&authorized, role, Action::Delete)?;
        let actor_id = authorized.subject.user_id;
        let scope_id = authorized.scope_id;

        if target_user_id == actor_id {
            let assignments = self.assignments.list_assignments(scope_id).await?;
            let another_admin = assignments.iter().any(|a| {
                a.user_id != actor_id && matches!(a.role, Role::Owner | Role::Admin)
            });
            if !another_admin {
                return Err(TesseraError::LastOwnerProtection { scope_id });
            }
        }

        self.assignments
            .revoke_role(target_user_id, scope_id, role)
            .await
    }

    /// Holding `Member/Manage` lets an admin run membership, but it
    /// must not let them mint or unseat owners: the touched role is
    /// capped at the actor's own.
    fn check_seniority(
        &self,
        authorized: &AuthorizedContext<'_>,
        target_role: Role,
        action: Action,
    ) -> TesseraResult<()> {
        if authorized.role.outranks_or_equals(target_role) {
            return Ok(());
        }
        tracing::warn!(
            user_id = %authorized.subject.user_id,
            scope_id = %authorized.scope_id,
            role = %authorized.role,
            target_role = %target_role,
            "denied: target role outranks the actor"
        );
        Err(TesseraError::Forbidden {
            resource: ResourceType::Member,
            action,
        })
    }

    /// Provisioning bootstrap: seed the first owner of a scope that
    /// has no assignments yet. The only path around the gate, and only
    /// valid while the scope is empty.
    pub async fn bootstrap_owner(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
    ) -> TesseraResult<RoleAssignment> {
        let existing = self.assignments.list_assignments(scope_id).await?;
        if !existing.is_empty() {
            return Err(TesseraError::Validation {
                message: format!("scope {scope_id} already has role assignments"),
            });
        }
        tracing::info!(user_id = %user_id, scope_id = %scope_id, "bootstrapping scope owner");
        self.assignments
            .assign_role(user_id, scope_id, Role::Owner)
            .await
    }

    /// Direct decision query for conditional business logic. Same
    /// semantics as [`AccessGate::require`] but collapses the outcome
    /// to a boolean; store failures still propagate.
    pub async fn is_authorized(
        &self,
        ctx: &RequestContext,
        resource: ResourceType,
        action: Action,
    ) -> TesseraResult<bool> {
        match self.require(ctx, resource, action).await {
            Ok(_) => Ok(true),
            Err(TesseraError::Forbidden { .. } | TesseraError::Unauthenticated { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// The data-dependent ownership check: the specific entity named by
/// the route must belong to the resolved tenant. This is a second
/// check that composes with the role check, never a replacement for
/// it. Cross-tenant entities surface as not-found so nothing leaks
/// about other tenants.
pub fn ensure_project_entity(
    ctx: &RequestContext,
    entity: &str,
    entity_id: Uuid,
    entity_project_id: Uuid,
) -> TesseraResult<()> {
    if entity_project_id == ctx.project.id {
        Ok(())
    } else {
        tracing::warn!(
            project = %ctx.project.id,
            entity = entity,
            entity_id = %entity_id,
            "entity belongs to a different tenant"
        );
        Err(TesseraError::NotFound {
            entity: entity.to_owned(),
            id: entity_id.to_string(),
        })
    }
}
