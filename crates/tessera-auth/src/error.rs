//! Authentication error types.

use tessera_core::error::TesseraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    /// The provider (or its key material) could not be reached. This
    /// is the one variant that must not collapse into "anonymous" —
    /// the caller surfaces it as a retryable 5xx instead.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("auth configuration error: {0}")]
    Configuration(String),
}

impl From<AuthError> for TesseraError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired | AuthError::TokenInvalid(_) => TesseraError::Unauthenticated {
                reason: err.to_string(),
            },
            AuthError::ProviderUnavailable(msg) => TesseraError::AuthProviderUnavailable(msg),
            AuthError::Configuration(msg) => TesseraError::Internal(msg),
        }
    }
}
