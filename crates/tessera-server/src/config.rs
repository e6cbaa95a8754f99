//! Environment-based server configuration.

use tessera_auth::IdentityConfig;
use tessera_db::DbConfig;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub identity: IdentityConfig,
}

impl ServerConfig {
    /// Load from `TESSERA_*` environment variables, falling back to
    /// local-development defaults for everything except the identity
    /// provider's public key, which has no safe default.
    pub fn from_env() -> Result<Self, String> {
        let db = DbConfig::from_env();

        let public_key = std::env::var("TESSERA_IDP_PUBLIC_KEY")
            .map_err(|_| "TESSERA_IDP_PUBLIC_KEY is required (PEM-encoded Ed25519)".to_owned())?;
        let issuer = env_or("TESSERA_IDP_ISSUER", "https://auth.tessera.dev");

        Ok(Self {
            db,
            identity: IdentityConfig::new(public_key, issuer),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
