//! Connection management for the SurrealDB-backed store.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;

/// Connection settings for the backing store.
///
/// [`DbConfig::from_env`] reads the `TESSERA_DB_*` variables; anything
/// unset falls back to the local-development defaults.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "tessera".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Load from the environment, one `TESSERA_DB_*` variable per
    /// field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env_or("TESSERA_DB_URL", defaults.url),
            namespace: env_or("TESSERA_DB_NAMESPACE", defaults.namespace),
            database: env_or("TESSERA_DB_NAME", defaults.database),
            username: env_or("TESSERA_DB_USER", defaults.username),
            password: env_or("TESSERA_DB_PASSWORD", defaults.password),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

/// Owns the live store connection. Cloning is cheap and shares the
/// underlying client.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open the WebSocket connection, authenticate as root, and select
    /// the configured namespace and database.
    ///
    /// Transport failures surface as [`DbError`], so callers inherit
    /// the store-unavailable taxonomy instead of a raw driver error.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "connecting to store"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("store connection established");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_config_falls_back_to_defaults() {
        // None of the TESSERA_DB_* variables are set in the test
        // environment, so from_env must mirror Default.
        let defaults = DbConfig::default();
        let loaded = DbConfig::from_env();
        assert_eq!(loaded.url, defaults.url);
        assert_eq!(loaded.namespace, defaults.namespace);
        assert_eq!(loaded.database, defaults.database);
        assert_eq!(loaded.username, defaults.username);
        assert_eq!(loaded.password, defaults.password);
    }
}
