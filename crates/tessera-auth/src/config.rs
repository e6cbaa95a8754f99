//! Identity provider configuration.

/// Configuration for verifying tokens from the external identity
/// provider.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// PEM-encoded Ed25519 public key published by the provider.
    pub jwt_public_key_pem: String,
    /// Expected `iss` claim.
    pub issuer: String,
    /// Clock-skew leeway for `exp`/`iat` validation, in seconds.
    pub leeway_secs: u64,
}

impl IdentityConfig {
    pub fn new(jwt_public_key_pem: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            jwt_public_key_pem: jwt_public_key_pem.into(),
            issuer: issuer.into(),
            leeway_secs: 30,
        }
    }
}
