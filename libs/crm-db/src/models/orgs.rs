use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The authoritative (user, organization, role) triple. Every permission
/// check goes through this record, never through the User alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub organization_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Manager,
    Admin,
    Owner,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct InvalidRole(pub String);

impl Role {
    /// Higher number == more privileges.
    pub fn priority(self) -> u8 {
        match self {
            Role::Member => 0,
            Role::Manager => 1,
            Role::Admin => 2,
            Role::Owner => 3,
        }
    }

    /// Minimum-role check: manager passes for required=manager, and so do
    /// admin and owner.
    pub fn meets_minimum(self, required: Role) -> bool {
        self.priority() >= required.priority()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_priority_is_a_strict_total_order() {
        let ordered = [Role::Member, Role::Manager, Role::Admin, Role::Owner];
        for pair in ordered.windows(2) {
            assert!(pair[0].priority() < pair[1].priority());
        }
    }

    #[test]
    fn meets_minimum_uses_the_hierarchy() {
        assert!(Role::Owner.meets_minimum(Role::Member));
        assert!(Role::Manager.meets_minimum(Role::Manager));
        assert!(!Role::Member.meets_minimum(Role::Manager));
        assert!(!Role::Admin.meets_minimum(Role::Owner));
    }

    #[test]
    fn unknown_role_strings_are_rejected() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
        assert_eq!("owner".parse::<Role>().unwrap(), Role::Owner);
    }

    #[test]
    fn role_round_trips_through_its_canonical_string() {
        for role in [Role::Member, Role::Manager, Role::Admin, Role::Owner] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }
}
