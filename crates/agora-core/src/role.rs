//! # Reviewer Roles & Capabilities
//!
//! The closed set of privileged roles and an explicit capability map from
//! role to permitted operations. The transport layer evaluates
//! [`ReviewerRole::permits`] before every privileged call; domain services
//! still re-validate their own state invariants (a moderator race is
//! resolved by the PENDING-only guard, not by role checks).

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A privileged operation a reviewer may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivilegedOp {
    /// Approve or reject contributions, singly or in batch.
    ModerateContributions,
    /// Read the moderation work queue and audit history.
    ViewModerationQueue,
    /// Decrypt and view a participant's registered identifiers.
    ViewIdentityDetails,
}

/// A reviewer role. Closed set; unknown role names are rejected at parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewerRole {
    /// Full access, including identity reveal.
    SuperAdmin,
    /// Works the moderation queue.
    Moderator,
    /// Read-only access to the queue and history.
    Analyst,
}

impl ReviewerRole {
    /// The operations this role may perform.
    ///
    /// This is the single source of truth for role gating — an explicit
    /// set per role rather than scattered comparisons.
    pub fn permitted_ops(&self) -> &'static [PrivilegedOp] {
        match self {
            Self::SuperAdmin => &[
                PrivilegedOp::ModerateContributions,
                PrivilegedOp::ViewModerationQueue,
                PrivilegedOp::ViewIdentityDetails,
            ],
            Self::Moderator => &[
                PrivilegedOp::ModerateContributions,
                PrivilegedOp::ViewModerationQueue,
            ],
            Self::Analyst => &[PrivilegedOp::ViewModerationQueue],
        }
    }

    /// Whether this role may perform `op`.
    pub fn permits(&self, op: PrivilegedOp) -> bool {
        self.permitted_ops().contains(&op)
    }

    /// The wire/storage name for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Moderator => "MODERATOR",
            Self::Analyst => "ANALYST",
        }
    }
}

impl std::fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewerRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "MODERATOR" => Ok(Self::Moderator),
            "ANALYST" => Ok(Self::Analyst),
            other => Err(ValidationError::InvalidRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_permits_everything() {
        for op in [
            PrivilegedOp::ModerateContributions,
            PrivilegedOp::ViewModerationQueue,
            PrivilegedOp::ViewIdentityDetails,
        ] {
            assert!(ReviewerRole::SuperAdmin.permits(op));
        }
    }

    #[test]
    fn moderator_cannot_reveal_identities() {
        assert!(ReviewerRole::Moderator.permits(PrivilegedOp::ModerateContributions));
        assert!(ReviewerRole::Moderator.permits(PrivilegedOp::ViewModerationQueue));
        assert!(!ReviewerRole::Moderator.permits(PrivilegedOp::ViewIdentityDetails));
    }

    #[test]
    fn analyst_is_read_only() {
        assert!(!ReviewerRole::Analyst.permits(PrivilegedOp::ModerateContributions));
        assert!(ReviewerRole::Analyst.permits(PrivilegedOp::ViewModerationQueue));
        assert!(!ReviewerRole::Analyst.permits(PrivilegedOp::ViewIdentityDetails));
    }

    #[test]
    fn role_parses_wire_form() {
        assert_eq!(
            "SUPER_ADMIN".parse::<ReviewerRole>().unwrap(),
            ReviewerRole::SuperAdmin
        );
        assert_eq!(
            "MODERATOR".parse::<ReviewerRole>().unwrap(),
            ReviewerRole::Moderator
        );
        assert!("INTERN".parse::<ReviewerRole>().is_err());
    }

    #[test]
    fn serde_matches_as_str() {
        for role in [
            ReviewerRole::SuperAdmin,
            ReviewerRole::Moderator,
            ReviewerRole::Analyst,
        ] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }
}
