//! Per-request context resolution: hostname → tenant, credential →
//! subject.
//!
//! Resolution order is fixed: the tenant must resolve before any
//! credential work, and a failed tenant lookup is terminal — there is
//! no default tenant to fall through to. A missing or invalid
//! credential yields an anonymous subject (many tenant routes are
//! public); a provider outage propagates as a retryable failure.
//!
//! A [`RequestContext`] is built once per request and passed along
//! explicitly. It is never cached across requests: tenant resolution
//! depends on the host header and the subject on the token.

use tessera_core::error::{TesseraError, TesseraResult};
use tessera_core::models::project::Project;
use tessera_core::repository::{ProjectRepository, UserRepository};
use uuid::Uuid;

use crate::error::AuthError;
use crate::token::IdentityProvider;

/// Transport-level request metadata, already extracted from HTTP by
/// the (out-of-scope) routing layer.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Raw host header value; may carry a port.
    pub hostname: String,
    /// Raw bearer credential, if any was presented.
    pub bearer_token: Option<String>,
}

/// The authenticated subject, mirrored into the local user store.
#[derive(Debug, Clone)]
pub struct Subject {
    /// Local user id (the id policy checks run against).
    pub user_id: Uuid,
    /// The identity provider's opaque external id.
    pub external_id: String,
    pub email: String,
}

/// The verified per-request context handed to downstream code.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub project: Project,
    /// `None` for anonymous (credential-less or invalid-credential)
    /// requests.
    pub subject: Option<Subject>,
}

/// Builds a [`RequestContext`] from raw request metadata.
///
/// Dependencies are injected so the resolver can be tested in
/// isolation with in-memory stores and a fake provider.
pub struct ContextResolver<P, U, I> {
    projects: P,
    users: U,
    identity: I,
}

impl<P, U, I> ContextResolver<P, U, I>
where
    P: ProjectRepository,
    U: UserRepository,
    I: IdentityProvider,
{
    pub fn new(projects: P, users: U, identity: I) -> Self {
        Self {
            projects,
            users,
            identity,
        }
    }

    /// Resolve tenant and subject for one request.
    pub async fn resolve(&self, meta: &RequestMeta) -> TesseraResult<RequestContext> {
        let hostname = normalize_hostname(&meta.hostname)?;

        // Step A: tenant resolution. Terminal on failure.
        let project = self.projects.resolve_by_domain(&hostname).await?;

        // Step B: credential validation. Anonymous on absence or
        // invalidity; terminal only on provider outage.
        let subject = match meta.bearer_token.as_deref() {
            None => None,
            Some(token) => match self.identity.validate_credential(token).await {
                Ok(claims) => {
                    let user = self
                        .users
                        .get_or_create_by_external_id(&claims.sub, &claims.email)
                        .await?;
                    Some(Subject {
                        user_id: user.id,
                        external_id: user.external_id,
                        email: user.email,
                    })
                }
                Err(AuthError::ProviderUnavailable(msg)) => {
                    return Err(TesseraError::AuthProviderUnavailable(msg));
                }
                Err(e) => {
                    tracing::debug!(
                        project = %project.slug,
                        error = %e,
                        "credential rejected, continuing anonymously"
                    );
                    None
                }
            },
        };

        tracing::debug!(
            project = %project.slug,
            authenticated = subject.is_some(),
            "request context resolved"
        );

        Ok(RequestContext { project, subject })
    }
}

/// Lowercase the host header and strip any port suffix.
fn normalize_hostname(raw: &str) -> TesseraResult<String> {
    let host = raw.trim().to_ascii_lowercase();
    let host = host.split(':').next().unwrap_or("");
    if host.is_empty() {
        return Err(TesseraError::Validation {
            message: "empty host header".into(),
        });
    }
    Ok(host.to_owned())
}

#[cfg(test)]
mod tests {
    use super::normalize_hostname;

    #[test]
    fn hostname_is_lowercased_and_port_stripped() {
        assert_eq!(
            normalize_hostname("Acme.Example.COM:8443").unwrap(),
            "acme.example.com"
        );
        assert_eq!(
            normalize_hostname(" acme.example.com ").unwrap(),
            "acme.example.com"
        );
    }

    #[test]
    fn empty_hostname_is_rejected() {
        assert!(normalize_hostname("").is_err());
        assert!(normalize_hostname(":8080").is_err());
        assert!(normalize_hostname("   ").is_err());
    }
}
