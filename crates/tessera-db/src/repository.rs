//! SurrealDB repository implementations.

mod domain_binding;
mod organization;
mod project;
mod role_assignment;
mod user;

pub use domain_binding::SurrealDomainBindingRepository;
pub use organization::SurrealOrganizationRepository;
pub use project::SurrealProjectRepository;
pub use role_assignment::SurrealRoleAssignmentRepository;
pub use user::SurrealUserRepository;
