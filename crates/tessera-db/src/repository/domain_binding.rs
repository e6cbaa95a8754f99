//! SurrealDB implementation of [`DomainBindingRepository`].
//!
//! The unique index on `domain` is what upholds the at-most-one
//! binding (and therefore at-most-one verified binding) invariant;
//! this layer just reports the violation as a typed duplicate error.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::domain_binding::{CreateDomainBinding, DomainBinding};
use tessera_core::repository::DomainBindingRepository;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct BindingRow {
    domain: String,
    project_id: String,
    verified: bool,
    created_at: DateTime<Utc>,
}

impl BindingRow {
    fn into_binding(self, id: Uuid) -> Result<DomainBinding, DbError> {
        let project_id = Uuid::parse_str(&self.project_id)
            .map_err(|e| DbError::Migration(format!("invalid project UUID: {e}")))?;
        Ok(DomainBinding {
            id,
            domain: self.domain,
            project_id,
            verified: self.verified,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct BindingRowWithId {
    record_id: String,
    domain: String,
    project_id: String,
    verified: bool,
    created_at: DateTime<Utc>,
}

impl BindingRowWithId {
    fn try_into_binding(self) -> Result<DomainBinding, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let project_id = Uuid::parse_str(&self.project_id)
            .map_err(|e| DbError::Migration(format!("invalid project UUID: {e}")))?;
        Ok(DomainBinding {
            id,
            domain: self.domain,
            project_id,
            verified: self.verified,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the domain binding repository.
#[derive(Clone)]
pub struct SurrealDomainBindingRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDomainBindingRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DomainBindingRepository for SurrealDomainBindingRepository<C> {
    async fn add(&self, input: CreateDomainBinding) -> TesseraResult<DomainBinding> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let domain = input.domain.to_ascii_lowercase();

        let result = self
            .db
            .query(
                "CREATE type::record('project_domain', $id) SET \
                 domain = $domain, project_id = $project_id, \
                 verified = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("domain", domain.clone()))
            .bind(("project_id", input.project_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| {
            if e.to_string().contains("idx_project_domain_domain") {
                DbError::Duplicate {
                    entity: format!("domain '{domain}'"),
                }
            } else {
                DbError::Migration(e.to_string())
            }
        })?;

        let rows: Vec<BindingRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project_domain".into(),
            id: id_str,
        })?;

        Ok(row.into_binding(id)?)
    }

    async fn mark_verified(&self, domain: &str) -> TesseraResult<DomainBinding> {
        let domain = domain.to_ascii_lowercase();

        let mut result = self
            .db
            .query(
                "UPDATE project_domain SET verified = true \
                 WHERE domain = $domain; \
                 SELECT meta::id(id) AS record_id, * FROM project_domain \
                 WHERE domain = $domain",
            )
            .bind(("domain", domain.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BindingRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project_domain".into(),
            id: domain,
        })?;

        Ok(row.try_into_binding()?)
    }

    async fn remove(&self, domain: &str) -> TesseraResult<()> {
        let domain = domain.to_ascii_lowercase();

        self.db
            .query("DELETE project_domain WHERE domain = $domain")
            .bind(("domain", domain))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> TesseraResult<Vec<DomainBinding>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM project_domain \
                 WHERE project_id = $project_id ORDER BY created_at ASC",
            )
            .bind(("project_id", project_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BindingRowWithId> = result.take(0).map_err(DbError::from)?;

        let bindings = rows
            .into_iter()
            .map(|row| row.try_into_binding())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(bindings)
    }
}
