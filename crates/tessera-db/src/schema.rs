//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. The role enumeration is stored as a
//! string with an ASSERT constraint for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (billing/ownership grouping of projects and users)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD slug ON TABLE organization TYPE string;
DEFINE FIELD owner_user_id ON TABLE organization TYPE string;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_slug ON TABLE organization \
    COLUMNS slug UNIQUE;

-- =======================================================================
-- Projects (tenants, owned by an organization)
-- =======================================================================
DEFINE TABLE project SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE project TYPE string;
DEFINE FIELD name ON TABLE project TYPE string;
DEFINE FIELD slug ON TABLE project TYPE string;
DEFINE FIELD active ON TABLE project TYPE bool DEFAULT true;
DEFINE FIELD theme ON TABLE project TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE project TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE project TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_project_slug ON TABLE project COLUMNS slug UNIQUE;

-- =======================================================================
-- Domain bindings (hostname -> project, resolvable only when verified)
-- =======================================================================
DEFINE TABLE project_domain SCHEMAFULL;
DEFINE FIELD domain ON TABLE project_domain TYPE string;
DEFINE FIELD project_id ON TABLE project_domain TYPE string;
DEFINE FIELD verified ON TABLE project_domain TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE project_domain TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_project_domain_domain ON TABLE project_domain \
    COLUMNS domain UNIQUE;

-- =======================================================================
-- Users (local mirror of external identities)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD external_id ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_external_id ON TABLE user \
    COLUMNS external_id UNIQUE;

-- =======================================================================
-- Role assignments (one effective role per user per scope)
-- =======================================================================
DEFINE TABLE role_assignment SCHEMAFULL;
DEFINE FIELD user_id ON TABLE role_assignment TYPE string;
DEFINE FIELD scope_id ON TABLE role_assignment TYPE string;
DEFINE FIELD role ON TABLE role_assignment TYPE string \
    ASSERT $value IN ['owner', 'admin', 'member', 'viewer'];
DEFINE FIELD created_at ON TABLE role_assignment TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role_assignment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_assignment_user_scope ON TABLE role_assignment \
    COLUMNS user_id, scope_id UNIQUE;

-- =======================================================================
-- Scope guards (per-scope write anchor; role mutations touch the
-- scope's record inside their transaction so concurrent mutations on
-- one scope conflict instead of committing against stale reads)
-- =======================================================================
DEFINE TABLE scope_guard SCHEMAFULL;
DEFINE FIELD touched_at ON TABLE scope_guard TYPE datetime \
    DEFAULT time::now();
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Bring the schema up to the latest version.
///
/// The `_migration` tracking table is created on first run; every
/// migration above the recorded version is then applied and recorded,
/// so re-running the runner is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current = current_version(db).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(
            version = migration.version,
            name = migration.name,
            "applying schema migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "recording migration v{} failed: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "schema migration applied");
    }

    Ok(())
}

/// Highest version recorded in the tracking table, 0 on a fresh store.
async fn current_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.first().map(|m| m.version).unwrap_or(0))
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
