//! Workspace roles.
//!
//! Roles are three ranked tiers, `viewer < member < owner`. Authorization is a
//! minimum-rank comparison, never a capability lookup.

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Rank of each role, indexed by the enum discriminant.
const RANKS: [u8; 3] = [1, 2, 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer = 0,
    Member = 1,
    Owner = 2,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Viewer, Role::Member, Role::Owner];

    #[must_use]
    pub const fn rank(self) -> u8 {
        RANKS[self as usize]
    }

    /// `true` when `self` grants at least the privileges of `required`.
    #[must_use]
    pub const fn at_least(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Canonical role string stored in `workspace_members.role`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Member => "member",
            Self::Owner => "owner",
        }
    }

    /// Decode a role read back from storage.
    ///
    /// Unknown values mean the row was written outside the engine, so they
    /// surface as [`EngineError::CorruptedRole`] instead of a user error.
    pub(crate) fn from_stored(value: &str) -> Result<Self, EngineError> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| EngineError::CorruptedRole(value.to_string()))
    }
}

/// Free-function form of [`Role::at_least`].
#[must_use]
pub const fn role_at_least(actual: Role, required: Role) -> bool {
    actual.at_least(required)
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "owner" => Ok(Self::Owner),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            other => Err(EngineError::InvalidRole(format!(
                "role must be one of owner | member | viewer, got \"{other}\""
            ))),
        }
    }
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_is_reflexive() {
        for role in Role::ALL {
            assert!(role.at_least(role), "{role} should satisfy itself");
        }
    }

    #[test]
    fn at_least_follows_rank_order() {
        assert!(!role_at_least(Role::Viewer, Role::Owner));
        assert!(!role_at_least(Role::Viewer, Role::Member));
        assert!(!role_at_least(Role::Member, Role::Owner));
        assert!(role_at_least(Role::Owner, Role::Viewer));
        assert!(role_at_least(Role::Owner, Role::Member));
        assert!(role_at_least(Role::Member, Role::Viewer));
    }

    #[test]
    fn parse_trims_and_rejects_unknown() {
        assert_eq!(Role::try_from(" member ").unwrap(), Role::Member);
        assert_eq!("owner".parse::<Role>().unwrap(), Role::Owner);
        assert!(matches!(
            Role::try_from("admin"),
            Err(EngineError::InvalidRole(_))
        ));
        assert!(matches!(Role::try_from("Owner"), Err(EngineError::InvalidRole(_))));
    }

    #[test]
    fn stored_values_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_stored(role.as_str()).unwrap(), role);
        }
        assert_eq!(
            Role::from_stored("superuser"),
            Err(EngineError::CorruptedRole("superuser".to_string()))
        );
    }
}
