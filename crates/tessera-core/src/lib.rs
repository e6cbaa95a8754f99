//! Tessera Core — domain models, the policy engine, and repository
//! trait contracts shared across all crates.
//!
//! This crate is pure: no I/O, no database, no HTTP. The policy engine
//! in [`policy`] is a deterministic, total function over closed
//! enumerations; everything that touches the outside world lives behind
//! the traits in [`repository`].

pub mod error;
pub mod models;
pub mod policy;
pub mod repository;

pub use error::{TesseraError, TesseraResult};
pub use policy::{Action, PolicyCache, ResourceType, Role, is_authorized};
