//! The policy engine: closed enumerations for roles, resource types,
//! and actions, plus the deterministic grant-evaluation function.
//!
//! There is no explicit-deny concept — only absence of grant. An
//! unmatched (role, resource, action) tuple is always a deny
//! (fail-closed). Evaluation order is exact grant, then the `Manage`
//! action wildcard on the resource, then the blanket resource wildcard.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Access level a user holds within a scope.
///
/// Closed enumeration; the database layer stores these as strings with
/// an `ASSERT` constraint and round-trips them through [`Role::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    /// Seniority comparison used when administering membership: a
    /// subject may not grant or revoke a role above their own.
    pub fn outranks_or_equals(self, other: Role) -> bool {
        self.seniority() >= other.seniority()
    }

    fn seniority(self) -> u8 {
        match self {
            Self::Owner => 3,
            Self::Admin => 2,
            Self::Member => 1,
            Self::Viewer => 0,
        }
    }

    /// Parse the stored string form. Returns `None` for unknown values
    /// so callers can surface a validation error instead of panicking.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Project,
    Customer,
    Campaign,
    Template,
    ApiKey,
    Domain,
    Member,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Customer => "customer",
            Self::Campaign => "campaign",
            Self::Template => "template",
            Self::ApiKey => "api_key",
            Self::Domain => "domain",
            Self::Member => "member",
        }
    }

    /// Every resource type, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Project,
        Self::Customer,
        Self::Campaign,
        Self::Template,
        Self::ApiKey,
        Self::Domain,
        Self::Member,
    ];
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the resource is being accessed. `Manage` is the action
/// wildcard: a `Manage` grant subsumes every specific action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Manage,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
        }
    }

    /// Every action, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Create,
        Self::Read,
        Self::Update,
        Self::Delete,
        Self::Manage,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One allow entry in the permission table.
///
/// `resource: None` is the blanket wildcard: the role may perform any
/// action on any resource type.
#[derive(Debug, Clone, Copy)]
struct Grant {
    role: Role,
    resource: Option<ResourceType>,
    action: Action,
}

const fn grant(role: Role, resource: ResourceType, action: Action) -> Grant {
    Grant {
        role,
        resource: Some(resource),
        action,
    }
}

/// The permission table. Allow-only; anything absent is denied.
static GRANTS: &[Grant] = &[
    // Owner: blanket access to every resource type.
    Grant {
        role: Role::Owner,
        resource: None,
        action: Action::Manage,
    },
    // Admin: full control of tenant resources, but cannot provision or
    // delete the project itself.
    grant(Role::Admin, ResourceType::Project, Action::Read),
    grant(Role::Admin, ResourceType::Project, Action::Update),
    grant(Role::Admin, ResourceType::Customer, Action::Manage),
    grant(Role::Admin, ResourceType::Campaign, Action::Manage),
    grant(Role::Admin, ResourceType::Template, Action::Manage),
    grant(Role::Admin, ResourceType::ApiKey, Action::Manage),
    grant(Role::Admin, ResourceType::Domain, Action::Manage),
    grant(Role::Admin, ResourceType::Member, Action::Manage),
    // Member: day-to-day editing, no destructive or membership ops.
    grant(Role::Member, ResourceType::Project, Action::Read),
    grant(Role::Member, ResourceType::Customer, Action::Create),
    grant(Role::Member, ResourceType::Customer, Action::Read),
    grant(Role::Member, ResourceType::Customer, Action::Update),
    grant(Role::Member, ResourceType::Campaign, Action::Create),
    grant(Role::Member, ResourceType::Campaign, Action::Read),
    grant(Role::Member, ResourceType::Campaign, Action::Update),
    grant(Role::Member, ResourceType::Template, Action::Create),
    grant(Role::Member, ResourceType::Template, Action::Read),
    grant(Role::Member, ResourceType::Template, Action::Update),
    grant(Role::Member, ResourceType::Member, Action::Read),
    // Viewer: read-only, and no credential material.
    grant(Role::Viewer, ResourceType::Project, Action::Read),
    grant(Role::Viewer, ResourceType::Customer, Action::Read),
    grant(Role::Viewer, ResourceType::Campaign, Action::Read),
    grant(Role::Viewer, ResourceType::Template, Action::Read),
];

/// Evaluate whether `role` may perform `action` on `resource`.
///
/// Deterministic and side-effect free. Evaluation order:
///
/// 1. exact grant for (role, resource, action);
/// 2. a `Manage` grant on the resource (action wildcard);
/// 3. a blanket grant for the role (resource wildcard).
///
/// Absence of any matching grant is a deny.
pub fn is_authorized(role: Role, resource: ResourceType, action: Action) -> bool {
    let mut manage = false;
    let mut blanket = false;
    for g in GRANTS {
        if g.role != role {
            continue;
        }
        match g.resource {
            Some(r) if r == resource => {
                if g.action == action {
                    return true;
                }
                if g.action == Action::Manage {
                    manage = true;
                }
            }
            Some(_) => {}
            None => blanket = true,
        }
    }
    manage || blanket
}

/// Request-scoped memoization of policy decisions.
///
/// The engine itself is cheap, but routes that run many checks can
/// reuse one of these for the lifetime of a single request. Never
/// share a cache across requests: role assignments may change between
/// them and a stale allow is a security defect.
#[derive(Debug, Default)]
pub struct PolicyCache {
    decisions: HashMap<(Role, ResourceType, Action), bool>,
}

impl PolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized [`is_authorized`].
    pub fn is_authorized(&mut self, role: Role, resource: ResourceType, action: Action) -> bool {
        *self
            .decisions
            .entry((role, resource, action))
            .or_insert_with(|| is_authorized(role, resource, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_tuples_are_denied() {
        // Viewer has no grants at all on credential material.
        assert!(!is_authorized(Role::Viewer, ResourceType::ApiKey, Action::Read));
        assert!(!is_authorized(Role::Viewer, ResourceType::Domain, Action::Create));
        // Member can edit campaigns but not delete them.
        assert!(!is_authorized(Role::Member, ResourceType::Campaign, Action::Delete));
        // No role check ever errors; every tuple evaluates.
        for resource in ResourceType::ALL {
            for action in Action::ALL {
                let _ = is_authorized(Role::Viewer, resource, action);
            }
        }
    }

    #[test]
    fn manage_grant_subsumes_every_action() {
        // Admin holds Manage on Campaign.
        for action in Action::ALL {
            assert!(
                is_authorized(Role::Admin, ResourceType::Campaign, action),
                "admin denied campaign {action}"
            );
        }
    }

    #[test]
    fn blanket_grant_covers_every_resource_and_action() {
        for resource in ResourceType::ALL {
            for action in Action::ALL {
                assert!(
                    is_authorized(Role::Owner, resource, action),
                    "owner denied {action} on {resource}"
                );
            }
        }
    }

    #[test]
    fn exact_grants_do_not_leak_sideways() {
        // Member's Campaign grants do not bleed into ApiKey.
        assert!(is_authorized(Role::Member, ResourceType::Campaign, Action::Update));
        assert!(!is_authorized(Role::Member, ResourceType::ApiKey, Action::Read));
        // Admin's Project grants are exact: Read/Update yes, Delete no.
        assert!(is_authorized(Role::Admin, ResourceType::Project, Action::Update));
        assert!(!is_authorized(Role::Admin, ResourceType::Project, Action::Delete));
        assert!(!is_authorized(Role::Admin, ResourceType::Project, Action::Manage));
    }

    #[test]
    fn cache_agrees_with_engine() {
        let mut cache = PolicyCache::new();
        for role in [Role::Owner, Role::Admin, Role::Member, Role::Viewer] {
            for resource in ResourceType::ALL {
                for action in Action::ALL {
                    assert_eq!(
                        cache.is_authorized(role, resource, action),
                        is_authorized(role, resource, action)
                    );
                    // Second hit comes from the map; same answer.
                    assert_eq!(
                        cache.is_authorized(role, resource, action),
                        is_authorized(role, resource, action)
                    );
                }
            }
        }
    }

    #[test]
    fn seniority_is_a_total_order() {
        let ranked = [Role::Viewer, Role::Member, Role::Admin, Role::Owner];
        for (i, lower) in ranked.iter().enumerate() {
            for higher in &ranked[i + 1..] {
                assert!(higher.outranks_or_equals(*lower));
                assert!(!lower.outranks_or_equals(*higher));
            }
            assert!(lower.outranks_or_equals(*lower));
        }
    }

    #[test]
    fn role_string_round_trip() {
        for role in [Role::Owner, Role::Admin, Role::Member, Role::Viewer] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
    }
}
