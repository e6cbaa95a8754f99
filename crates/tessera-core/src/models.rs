//! Domain models for Tessera.
//!
//! These are the core types shared across all crates.

pub mod domain_binding;
pub mod organization;
pub mod project;
pub mod role_assignment;
pub mod user;
