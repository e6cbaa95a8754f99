//! SurrealDB implementation of [`RoleAssignmentRepository`] — the
//! policy store.
//!
//! Every mutation touches a per-scope `scope_guard` record inside its
//! transaction before reading anything. Two concurrent mutations on
//! the same scope therefore write the same key, so the storage engine
//! aborts one of them instead of letting both commit against stale
//! reads; the aborted side retries and re-evaluates the guards against
//! the committed state.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::role_assignment::RoleAssignment;
use tessera_core::policy::Role;
use tessera_core::repository::RoleAssignmentRepository;
use uuid::Uuid;

use crate::error::DbError;

/// Sentinel thrown inside the revoke transaction when the guard trips.
const LAST_OWNER_SENTINEL: &str = "last_owner_protection";
/// Sentinel thrown when the assignment to revoke does not exist.
const MISSING_SENTINEL: &str = "assignment_missing";
/// Retries before a persistent commit conflict is surfaced.
const MAX_ATTEMPTS: usize = 4;

/// Commit-conflict errors are retryable; everything else is not.
fn is_conflict(msg: &str) -> bool {
    msg.contains("read or write conflict") || msg.contains("can be retried")
}

#[derive(Debug, SurrealValue)]
struct AssignmentRowWithId {
    record_id: String,
    user_id: String,
    scope_id: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AssignmentRowWithId {
    fn try_into_assignment(self) -> Result<RoleAssignment, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        let scope_id = Uuid::parse_str(&self.scope_id)
            .map_err(|e| DbError::Migration(format!("invalid scope UUID: {e}")))?;
        let role = Role::parse(&self.role)
            .ok_or_else(|| DbError::Migration(format!("unknown role '{}'", self.role)))?;
        Ok(RoleAssignment {
            id,
            user_id,
            scope_id,
            role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the role assignment repository.
#[derive(Clone)]
pub struct SurrealRoleAssignmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleAssignmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// One upsert attempt. Conflict errors come back as
    /// [`DbError::Conflict`] for the caller to retry.
    async fn try_assign(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
        role: Role,
    ) -> Result<RoleAssignment, DbError> {
        let new_id = Uuid::new_v4().to_string();

        // Replace the existing role for the (user, scope) pair or
        // create a fresh assignment. Re-assigning the same role is a
        // no-op at the caller's level of observation. The unique
        // (user_id, scope_id) index backstops races the guard misses.
        let mut result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 UPSERT type::record('scope_guard', $scope_id) SET \
                     touched_at = time::now(); \
                 LET $existing = (SELECT * FROM role_assignment \
                     WHERE user_id = $user_id AND scope_id = $scope_id); \
                 IF array::len($existing) > 0 { \
                     UPDATE role_assignment SET role = $role, \
                         updated_at = time::now() \
                     WHERE user_id = $user_id AND scope_id = $scope_id; \
                 } ELSE { \
                     CREATE type::record('role_assignment', $new_id) SET \
                         user_id = $user_id, scope_id = $scope_id, \
                         role = $role; \
                 }; \
                 COMMIT TRANSACTION; \
                 SELECT meta::id(id) AS record_id, * FROM role_assignment \
                 WHERE user_id = $user_id AND scope_id = $scope_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("scope_id", scope_id.to_string()))
            .bind(("role", role.as_str()))
            .bind(("new_id", new_id))
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if is_conflict(&msg) {
                    DbError::Conflict(msg)
                } else {
                    DbError::Surreal(e)
                }
            })?;

        if let Some(err) = classify_statement_errors(&mut result, user_id, scope_id) {
            return Err(err);
        }

        let last = result.num_statements() - 1;
        let rows: Vec<AssignmentRowWithId> = result.take(last)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role_assignment".into(),
            id: format!("{user_id}/{scope_id}"),
        })?;

        row.try_into_assignment()
    }

    /// One revoke attempt. The membership probe, the owner count, and
    /// the delete all run inside the transaction that touched the
    /// scope guard, so the count cannot go stale between the read and
    /// the delete.
    async fn try_revoke(&self, user_id: Uuid, scope_id: Uuid, role: Role) -> Result<(), DbError> {
        let mut result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 UPSERT type::record('scope_guard', $scope_id) SET \
                     touched_at = time::now(); \
                 LET $existing = (SELECT * FROM role_assignment \
                     WHERE user_id = $user_id AND scope_id = $scope_id \
                     AND role = $role); \
                 IF array::len($existing) == 0 { \
                     THROW 'assignment_missing'; \
                 }; \
                 IF $role == 'owner' { \
                     LET $owners = (SELECT * FROM role_assignment \
                         WHERE scope_id = $scope_id AND role = 'owner'); \
                     IF array::len($owners) <= 1 { \
                         THROW 'last_owner_protection'; \
                     }; \
                 }; \
                 DELETE role_assignment \
                 WHERE user_id = $user_id AND scope_id = $scope_id \
                 AND role = $role; \
                 COMMIT TRANSACTION;",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("scope_id", scope_id.to_string()))
            .bind(("role", role.as_str()))
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if is_conflict(&msg) {
                    DbError::Conflict(msg)
                } else {
                    DbError::Surreal(e)
                }
            })?;

        match classify_statement_errors(&mut result, user_id, scope_id) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Inspect every statement error individually. `Response::check()`
/// collapses an aborted transaction into one generic failed-transaction
/// message; the THROW text only survives on its own statement, so the
/// sentinels have to be matched across the full error set.
fn classify_statement_errors(
    result: &mut surrealdb::IndexedResults,
    user_id: Uuid,
    scope_id: Uuid,
) -> Option<DbError> {
    let errors = result.take_errors();
    if errors.is_empty() {
        return None;
    }

    let mut conflict = None;
    let mut other = None;
    for (_, e) in errors {
        let msg = e.to_string();
        if msg.contains(LAST_OWNER_SENTINEL) {
            return Some(DbError::LastOwner { scope_id });
        }
        if msg.contains(MISSING_SENTINEL) {
            return Some(DbError::NotFound {
                entity: "role_assignment".into(),
                id: format!("{user_id}/{scope_id}"),
            });
        }
        if is_conflict(&msg) {
            conflict = Some(msg);
        } else if !msg.contains("failed transaction") {
            // Statements skipped because an earlier one aborted carry
            // no information; anything else is a real failure.
            other = Some(msg);
        }
    }

    if let Some(msg) = other {
        return Some(DbError::Migration(msg));
    }
    Some(DbError::Conflict(
        conflict.unwrap_or_else(|| "transaction aborted".into()),
    ))
}

impl<C: Connection> RoleAssignmentRepository for SurrealRoleAssignmentRepository<C> {
    async fn list_assignments(&self, scope_id: Uuid) -> TesseraResult<Vec<RoleAssignment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role_assignment \
                 WHERE scope_id = $scope_id ORDER BY created_at ASC",
            )
            .bind(("scope_id", scope_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;

        let assignments = rows
            .into_iter()
            .map(|row| row.try_into_assignment())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(assignments)
    }

    async fn get_role(&self, user_id: Uuid, scope_id: Uuid) -> TesseraResult<Option<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role_assignment \
                 WHERE user_id = $user_id AND scope_id = $scope_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("scope_id", scope_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_assignment()?.role)),
            None => Ok(None),
        }
    }

    async fn assign_role(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
        role: Role,
    ) -> TesseraResult<RoleAssignment> {
        let mut last = None;
        for _ in 0..MAX_ATTEMPTS {
            match self.try_assign(user_id, scope_id, role).await {
                Err(DbError::Conflict(msg)) => last = Some(msg),
                Err(e) => return Err(e.into()),
                Ok(assignment) => {
                    tracing::info!(
                        user_id = %user_id,
                        scope_id = %scope_id,
                        role = %role,
                        "role assigned"
                    );
                    return Ok(assignment);
                }
            }
        }
        Err(DbError::Conflict(last.unwrap_or_default()).into())
    }

    async fn revoke_role(&self, user_id: Uuid, scope_id: Uuid, role: Role) -> TesseraResult<()> {
        let mut last = None;
        for _ in 0..MAX_ATTEMPTS {
            match self.try_revoke(user_id, scope_id, role).await {
                Err(DbError::Conflict(msg)) => last = Some(msg),
                Err(e) => return Err(e.into()),
                Ok(()) => {
                    tracing::info!(
                        user_id = %user_id,
                        scope_id = %scope_id,
                        role = %role,
                        "role revoked"
                    );
                    return Ok(());
                }
            }
        }
        Err(DbError::Conflict(last.unwrap_or_default()).into())
    }
}
