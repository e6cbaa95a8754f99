//! User domain model.
//!
//! Authentication lives with an external identity provider; Tessera
//! mirrors each authenticated subject into a local record keyed by the
//! provider's opaque external id. Exactly one local user exists per
//! external identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Opaque subject id from the identity provider. Globally unique.
    pub external_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
