//! Integration tests for the policy store using in-memory SurrealDB:
//! idempotent assignment, last-owner protection, and the concurrent
//! revoke race.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use tessera_core::error::TesseraError;
use tessera_core::policy::Role;
use tessera_core::repository::RoleAssignmentRepository;
use tessera_db::repository::SurrealRoleAssignmentRepository;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

async fn setup() -> SurrealRoleAssignmentRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tessera_db::run_migrations(&db).await.unwrap();
    SurrealRoleAssignmentRepository::new(db)
}

#[tokio::test]
async fn assignment_is_idempotent() {
    let repo = setup().await;
    let user = Uuid::new_v4();
    let scope = Uuid::new_v4();

    repo.assign_role(user, scope, Role::Member).await.unwrap();
    repo.assign_role(user, scope, Role::Member).await.unwrap();

    let assignments = repo.list_assignments(scope).await.unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].user_id, user);
    assert_eq!(assignments[0].role, Role::Member);
}

#[tokio::test]
async fn reassignment_replaces_the_effective_role() {
    let repo = setup().await;
    let user = Uuid::new_v4();
    let scope = Uuid::new_v4();

    repo.assign_role(user, scope, Role::Member).await.unwrap();
    assert_eq!(repo.get_role(user, scope).await.unwrap(), Some(Role::Member));

    // One effective role per scope: promoting replaces, not appends.
    repo.assign_role(user, scope, Role::Admin).await.unwrap();
    assert_eq!(repo.get_role(user, scope).await.unwrap(), Some(Role::Admin));
    assert_eq!(repo.list_assignments(scope).await.unwrap().len(), 1);
}

#[tokio::test]
async fn scope_memberships_are_independent() {
    let repo = setup().await;
    let user = Uuid::new_v4();
    let scope_a = Uuid::new_v4();
    let scope_b = Uuid::new_v4();

    repo.assign_role(user, scope_a, Role::Owner).await.unwrap();
    repo.assign_role(user, scope_b, Role::Viewer).await.unwrap();

    assert_eq!(repo.get_role(user, scope_a).await.unwrap(), Some(Role::Owner));
    assert_eq!(repo.get_role(user, scope_b).await.unwrap(), Some(Role::Viewer));
    assert_eq!(repo.get_role(user, Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
async fn last_owner_cannot_be_revoked() {
    let repo = setup().await;
    let owner = Uuid::new_v4();
    let scope = Uuid::new_v4();

    repo.assign_role(owner, scope, Role::Owner).await.unwrap();

    let err = repo.revoke_role(owner, scope, Role::Owner).await.unwrap_err();
    assert!(
        matches!(err, TesseraError::LastOwnerProtection { scope_id } if scope_id == scope),
        "{err}"
    );

    // With a second owner in place the same revoke succeeds.
    let second = Uuid::new_v4();
    repo.assign_role(second, scope, Role::Owner).await.unwrap();
    repo.revoke_role(owner, scope, Role::Owner).await.unwrap();

    let remaining = repo.list_assignments(scope).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].user_id, second);
}

#[tokio::test]
async fn revoking_a_missing_assignment_is_not_found() {
    let repo = setup().await;
    let scope = Uuid::new_v4();

    let err = repo
        .revoke_role(Uuid::new_v4(), scope, Role::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::NotFound { .. }), "{err}");

    // Wrong role on an existing (user, scope) pair is also not-found.
    let user = Uuid::new_v4();
    repo.assign_role(user, scope, Role::Member).await.unwrap();
    let err = repo.revoke_role(user, scope, Role::Admin).await.unwrap_err();
    assert!(matches!(err, TesseraError::NotFound { .. }), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_owner_revokes_never_strip_all_owners() {
    let repo = setup().await;
    let scope = Uuid::new_v4();
    let owner_a = Uuid::new_v4();
    let owner_b = Uuid::new_v4();

    repo.assign_role(owner_a, scope, Role::Owner).await.unwrap();
    repo.assign_role(owner_b, scope, Role::Owner).await.unwrap();

    // Two revokes racing against different owners. Both transactions
    // write the scope guard before counting, so they conflict; the
    // loser retries against committed state, sees one owner left, and
    // trips the protection.
    let (res_a, res_b) = tokio::join!(
        repo.revoke_role(owner_a, scope, Role::Owner),
        repo.revoke_role(owner_b, scope, Role::Owner),
    );

    assert!(
        res_a.is_ok() ^ res_b.is_ok(),
        "exactly one revoke must win: {res_a:?} / {res_b:?}"
    );
    let survivor = if res_a.is_ok() { owner_b } else { owner_a };
    let err = res_a.err().or(res_b.err()).unwrap();
    assert!(
        matches!(err, TesseraError::LastOwnerProtection { scope_id } if scope_id == scope),
        "{err}"
    );

    let owners: Vec<_> = repo
        .list_assignments(scope)
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.role == Role::Owner)
        .collect();
    assert_eq!(owners.len(), 1, "scope left without exactly one owner");
    assert_eq!(owners[0].user_id, survivor);

    // The sole survivor is now protected too.
    let err = repo
        .revoke_role(survivor, scope, Role::Owner)
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::LastOwnerProtection { .. }), "{err}");
}
