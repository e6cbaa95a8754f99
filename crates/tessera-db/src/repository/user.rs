//! SurrealDB implementation of [`UserRepository`].
//!
//! Users are mirrors of externally authenticated identities. The
//! unique index on `external_id` plus the transactional get-or-create
//! below keep the one-local-user-per-external-identity invariant.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::user::User;
use tessera_core::repository::UserRepository;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UserRow {
    external_id: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> User {
        User {
            id,
            external_id: self.external_id,
            email: self.email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    external_id: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(User {
            id,
            external_id: self.external_id,
            email: self.email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn get_or_create_by_external_id(
        &self,
        external_id: &str,
        email: &str,
    ) -> TesseraResult<User> {
        let new_id = Uuid::new_v4().to_string();

        // One transaction: refresh the mirror if it exists, create it
        // otherwise. The unique index on external_id backstops races.
        let mut result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $existing = (SELECT * FROM user \
                     WHERE external_id = $external_id); \
                 IF array::len($existing) > 0 { \
                     UPDATE user SET email = $email, \
                         updated_at = time::now() \
                     WHERE external_id = $external_id; \
                 } ELSE { \
                     CREATE type::record('user', $new_id) SET \
                         external_id = $external_id, email = $email; \
                 }; \
                 COMMIT TRANSACTION; \
                 SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE external_id = $external_id",
            )
            .bind(("external_id", external_id.to_owned()))
            .bind(("email", email.to_owned()))
            .bind(("new_id", new_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(result.num_statements() - 1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: external_id.to_owned(),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn get_by_id(&self, id: Uuid) -> TesseraResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id))
    }

    async fn get_by_external_id(&self, external_id: &str) -> TesseraResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE external_id = $external_id",
            )
            .bind(("external_id", external_id.to_owned()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: external_id.to_owned(),
        })?;

        Ok(row.try_into_user()?)
    }
}
