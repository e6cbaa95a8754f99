//! Tessera Server — application entry point.
//!
//! Wires the access-control core: database connection, migrations,
//! repositories, the context resolver, and the authorization gate.
//! The HTTP transport mounts on top of the resolver/gate pair.

mod config;

use tessera_auth::{AccessGate, ContextResolver, JwtIdentityProvider};
use tessera_db::repository::{
    SurrealProjectRepository, SurrealRoleAssignmentRepository, SurrealUserRepository,
};
use tessera_db::{DbManager, run_migrations};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                "tessera=info"
                    .parse()
                    .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
            ),
        )
        .json()
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "fatal error, shutting down");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting Tessera server...");

    let config = ServerConfig::from_env()?;

    let db = DbManager::connect(&config.db).await?;
    run_migrations(db.client()).await?;

    let projects = SurrealProjectRepository::new(db.client().clone());
    let users = SurrealUserRepository::new(db.client().clone());
    let assignments = SurrealRoleAssignmentRepository::new(db.client().clone());
    let identity = JwtIdentityProvider::new(config.identity.clone());

    // The transport layer borrows these for every request; building
    // them here fails fast on misconfiguration.
    let _resolver = ContextResolver::new(projects, users, identity);
    let _gate = AccessGate::new(assignments);

    tracing::info!("Access-control core ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Tessera server stopped.");

    Ok(())
}
