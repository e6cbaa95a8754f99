//! Tessera Auth — identity-provider credential validation, per-request
//! context resolution, and the authorization gate.
//!
//! Authentication itself is delegated to an external identity
//! provider; this crate verifies the tokens it issues, resolves the
//! tenant for the request's hostname, and enforces the policy engine's
//! decision before any business handler runs.

pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod token;

pub use config::IdentityConfig;
pub use context::{ContextResolver, RequestContext, RequestMeta, Subject};
pub use error::AuthError;
pub use gate::{AccessGate, AuthorizedContext, Scope, ensure_project_entity};
pub use token::{CredentialClaims, IdentityProvider, JwtIdentityProvider};
