//! Credential validation against the external identity provider.
//!
//! The provider signs EdDSA (Ed25519) JWTs; we verify them locally
//! against its published public key. The provider abstraction exists
//! so the resolver can be exercised with fakes — including a
//! provider-outage fake, which must surface as `ProviderUnavailable`
//! and never as an anonymous subject.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::IdentityConfig;
use crate::error::AuthError;

/// Claims carried by every provider-issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject — the provider's opaque external user id.
    pub sub: String,
    /// The subject's email address.
    pub email: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// The external identity provider, seen from the core's side.
pub trait IdentityProvider: Send + Sync {
    /// Validate a raw credential and return its claims.
    ///
    /// Invalid or expired credentials are `TokenInvalid`/`TokenExpired`
    /// (callers treat these as anonymous); provider outages are
    /// `ProviderUnavailable` (callers must propagate, never deny).
    fn validate_credential(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<CredentialClaims, AuthError>> + Send;
}

/// Local EdDSA verification of provider-issued JWTs.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    config: IdentityConfig,
}

impl JwtIdentityProvider {
    pub fn new(config: IdentityConfig) -> Self {
        Self { config }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    async fn validate_credential(&self, token: &str) -> Result<CredentialClaims, AuthError> {
        let key = DecodingKey::from_ed_pem(self.config.jwt_public_key_pem.as_bytes())
            .map_err(|e| AuthError::Configuration(format!("invalid provider public key: {e}")))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = self.config.leeway_secs;

        let data = jsonwebtoken::decode::<CredentialClaims>(token, &key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            },
        )?;

        Ok(data.claims)
    }
}
