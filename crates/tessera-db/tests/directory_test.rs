//! Integration tests for the tenant directory using in-memory
//! SurrealDB: domain resolution, verification filtering, and the
//! public/admin lookup asymmetry.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use tessera_core::error::TesseraError;
use tessera_core::models::domain_binding::CreateDomainBinding;
use tessera_core::models::organization::CreateOrganization;
use tessera_core::models::project::{CreateProject, ProjectLookup, UpdateProject};
use tessera_core::repository::{
    DomainBindingRepository, OrganizationRepository, ProjectRepository,
};
use tessera_db::repository::{
    SurrealDomainBindingRepository, SurrealOrganizationRepository, SurrealProjectRepository,
};
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

/// Spin up an in-memory DB, run migrations, create an org and one
/// active project.
async fn setup() -> (
    SurrealProjectRepository<Db>,
    SurrealDomainBindingRepository<Db>,
    Uuid, // project_id
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tessera_db::run_migrations(&db).await.unwrap();

    let org_repo = SurrealOrganizationRepository::new(db.clone());
    let org = org_repo
        .create(CreateOrganization {
            name: "Acme Corp".into(),
            slug: "acme-corp".into(),
            owner_user_id: Uuid::new_v4(),
        })
        .await
        .unwrap();

    let project_repo = SurrealProjectRepository::new(db.clone());
    let project = project_repo
        .create(CreateProject {
            organization_id: org.id,
            name: "Acme Rewards".into(),
            slug: "acme".into(),
            theme: None,
        })
        .await
        .unwrap();

    let domain_repo = SurrealDomainBindingRepository::new(db.clone());

    (project_repo, domain_repo, project.id)
}

#[tokio::test]
async fn verified_domain_resolves_to_its_project() {
    let (projects, domains, project_id) = setup().await;

    domains
        .add(CreateDomainBinding {
            domain: "acme.example.com".into(),
            project_id,
        })
        .await
        .unwrap();
    domains.mark_verified("acme.example.com").await.unwrap();

    let resolved = projects.resolve_by_domain("acme.example.com").await.unwrap();
    assert_eq!(resolved.id, project_id);
    assert_eq!(resolved.slug, "acme");

    // Host headers arrive in arbitrary case.
    let resolved = projects.resolve_by_domain("ACME.Example.COM").await.unwrap();
    assert_eq!(resolved.id, project_id);
}

#[tokio::test]
async fn unregistered_domain_is_tenant_not_found() {
    let (projects, _domains, _project_id) = setup().await;

    let err = projects
        .resolve_by_domain("unregistered.example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::TenantNotFound { .. }), "{err}");
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn unverified_binding_never_resolves() {
    let (projects, domains, project_id) = setup().await;

    domains
        .add(CreateDomainBinding {
            domain: "pending.example.com".into(),
            project_id,
        })
        .await
        .unwrap();

    let err = projects
        .resolve_by_domain("pending.example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::TenantNotFound { .. }), "{err}");
}

#[tokio::test]
async fn domain_binding_is_unique_per_domain() {
    let (_projects, domains, project_id) = setup().await;

    domains
        .add(CreateDomainBinding {
            domain: "acme.example.com".into(),
            project_id,
        })
        .await
        .unwrap();

    // Second binding for the same domain, even for another project,
    // is rejected by the unique index.
    let err = domains
        .add(CreateDomainBinding {
            domain: "acme.example.com".into(),
            project_id: Uuid::new_v4(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::AlreadyExists { .. }), "{err}");
}

#[tokio::test]
async fn inactive_project_is_invisible_to_public_lookups() {
    let (projects, domains, project_id) = setup().await;

    domains
        .add(CreateDomainBinding {
            domain: "acme.example.com".into(),
            project_id,
        })
        .await
        .unwrap();
    domains.mark_verified("acme.example.com").await.unwrap();

    projects.set_active(project_id, false).await.unwrap();

    // Public traffic: domain, slug, and public id lookups all 404.
    assert!(matches!(
        projects.resolve_by_domain("acme.example.com").await,
        Err(TesseraError::TenantNotFound { .. })
    ));
    assert!(matches!(
        projects.resolve_by_slug("acme").await,
        Err(TesseraError::TenantNotFound { .. })
    ));
    assert!(matches!(
        projects.resolve_by_id(project_id, ProjectLookup::Public).await,
        Err(TesseraError::TenantNotFound { .. })
    ));

    // The owner's dashboard still sees it.
    let admin_view = projects
        .resolve_by_id(project_id, ProjectLookup::Admin)
        .await
        .unwrap();
    assert!(!admin_view.active);

    // Reactivation restores public resolution.
    projects.set_active(project_id, true).await.unwrap();
    let resolved = projects.resolve_by_domain("acme.example.com").await.unwrap();
    assert_eq!(resolved.id, project_id);
}

#[tokio::test]
async fn slug_resolution_and_uniqueness() {
    let (projects, _domains, project_id) = setup().await;

    let resolved = projects.resolve_by_slug("acme").await.unwrap();
    assert_eq!(resolved.id, project_id);

    let err = projects
        .create(CreateProject {
            organization_id: Uuid::new_v4(),
            name: "Impostor".into(),
            slug: "acme".into(),
            theme: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::AlreadyExists { .. }), "{err}");

    assert!(matches!(
        projects.resolve_by_slug("nope").await,
        Err(TesseraError::TenantNotFound { .. })
    ));
}

#[tokio::test]
async fn removed_binding_stops_resolving() {
    let (projects, domains, project_id) = setup().await;

    domains
        .add(CreateDomainBinding {
            domain: "old.example.com".into(),
            project_id,
        })
        .await
        .unwrap();
    domains.mark_verified("old.example.com").await.unwrap();
    assert!(projects.resolve_by_domain("old.example.com").await.is_ok());

    domains.remove("old.example.com").await.unwrap();
    assert!(matches!(
        projects.resolve_by_domain("old.example.com").await,
        Err(TesseraError::TenantNotFound { .. })
    ));

    let listed = domains.list_for_project(project_id).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn project_update_touches_only_named_fields() {
    let (projects, _domains, project_id) = setup().await;

    let updated = projects
        .update(
            project_id,
            UpdateProject {
                name: Some("Acme Loyalty".into()),
                theme: Some(serde_json::json!({ "accent": "#ff5500" })),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Acme Loyalty");
    assert_eq!(updated.theme["accent"], "#ff5500");
    assert_eq!(updated.slug, "acme");
    assert!(updated.active);
}
