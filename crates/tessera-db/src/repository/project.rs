//! SurrealDB implementation of [`ProjectRepository`] — the tenant
//! directory.
//!
//! Domain resolution consults only verified bindings, and public
//! lookups only active projects. The admin/public asymmetry on id
//! lookups is carried by [`ProjectLookup`], never by an implicit
//! filter.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::project::{CreateProject, Project, ProjectLookup, UpdateProject};
use tessera_core::repository::ProjectRepository;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ProjectRow {
    organization_id: String,
    name: String,
    slug: String,
    active: bool,
    theme: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRow {
    fn into_project(self, id: Uuid) -> Result<Project, DbError> {
        let org_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Migration(format!("invalid org UUID: {e}")))?;
        Ok(Project {
            id,
            organization_id: org_id,
            name: self.name,
            slug: self.slug,
            active: self.active,
            theme: self.theme,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ProjectRowWithId {
    record_id: String,
    organization_id: String,
    name: String,
    slug: String,
    active: bool,
    theme: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRowWithId {
    fn try_into_project(self) -> Result<Project, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let org_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Migration(format!("invalid org UUID: {e}")))?;
        Ok(Project {
            id,
            organization_id: org_id,
            name: self.name,
            slug: self.slug,
            active: self.active,
            theme: self.theme,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for binding lookups during domain resolution.
#[derive(Debug, SurrealValue)]
struct BindingProjectIdRow {
    project_id: String,
}

/// SurrealDB implementation of the Project repository.
#[derive(Clone)]
pub struct SurrealProjectRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProjectRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProjectRepository for SurrealProjectRepository<C> {
    async fn create(&self, input: CreateProject) -> TesseraResult<Project> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let theme = input
            .theme
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('project', $id) SET \
                 organization_id = $org_id, \
                 name = $name, slug = $slug, \
                 active = true, theme = $theme",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", input.organization_id.to_string()))
            .bind(("name", input.name))
            .bind(("slug", input.slug.clone()))
            .bind(("theme", theme))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| {
            // The unique slug index rejects duplicates here.
            if e.to_string().contains("idx_project_slug") {
                DbError::Duplicate {
                    entity: format!("project slug '{}'", input.slug),
                }
            } else {
                DbError::Migration(e.to_string())
            }
        })?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(id)?)
    }

    async fn resolve_by_domain(&self, hostname: &str) -> TesseraResult<Project> {
        let hostname = hostname.to_ascii_lowercase();

        // Two statements in one round trip: find the verified binding,
        // then load the active project it points at. An unverified
        // binding or inactive project falls out at either step.
        let mut result = self
            .db
            .query(
                "SELECT project_id FROM project_domain \
                 WHERE domain = $domain AND verified = true; \
                 SELECT meta::id(id) AS record_id, * FROM project \
                 WHERE active = true AND meta::id(id) IN (\
                     SELECT VALUE project_id FROM project_domain \
                     WHERE domain = $domain AND verified = true\
                 )",
            )
            .bind(("domain", hostname.clone()))
            .await
            .map_err(DbError::from)?;

        let bindings: Vec<BindingProjectIdRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<ProjectRowWithId> = result.take(1).map_err(DbError::from)?;

        // Distinguish nothing at all from a binding to a dead project;
        // both are TenantNotFound but the trace should say which.
        let row = match rows.into_iter().next() {
            Some(row) => row,
            None => {
                if bindings.is_empty() {
                    tracing::debug!(domain = %hostname, "no verified binding for domain");
                } else {
                    tracing::debug!(domain = %hostname, "verified binding points at inactive project");
                }
                return Err(DbError::TenantNotFound {
                    lookup: format!("domain '{hostname}'"),
                }
                .into());
            }
        };

        Ok(row.try_into_project()?)
    }

    async fn resolve_by_slug(&self, slug: &str) -> TesseraResult<Project> {
        let slug = slug.to_owned();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM project \
                 WHERE slug = $slug AND active = true",
            )
            .bind(("slug", slug.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::TenantNotFound {
                lookup: format!("slug '{slug}'"),
            })?;

        Ok(row.try_into_project()?)
    }

    async fn resolve_by_id(&self, id: Uuid, lookup: ProjectLookup) -> TesseraResult<Project> {
        let id_str = id.to_string();

        let query = match lookup {
            ProjectLookup::Public => {
                "SELECT * FROM type::record('project', $id) WHERE active = true"
            }
            ProjectLookup::Admin => "SELECT * FROM type::record('project', $id)",
        };

        let mut result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::TenantNotFound {
                lookup: format!("id '{id_str}'"),
            })?;

        Ok(row.into_project(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateProject) -> TesseraResult<Project> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.theme.is_some() {
            sets.push("theme = $theme");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('project', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(theme) = input.theme {
            builder = builder.bind(("theme", theme));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(id)?)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> TesseraResult<Project> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('project', $id) SET \
                 active = $active, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(id)?)
    }
}
