//! # Contribution Kinds
//!
//! The closed set of ways a participant can comment on a draft provision.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What a contribution proposes to do to the draft text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionKind {
    /// Amend the wording of an existing provision.
    Amend,
    /// Add a new provision.
    Add,
    /// Remove an existing provision.
    Remove,
    /// General comment, no text change proposed.
    Comment,
}

impl ContributionKind {
    /// Every contribution kind.
    pub const ALL: [ContributionKind; 4] = [Self::Amend, Self::Add, Self::Remove, Self::Comment];

    /// The wire/storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amend => "AMEND",
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Comment => "COMMENT",
        }
    }

    /// Human-readable label for listings and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Amend => "Amend existing wording",
            Self::Add => "Add a new provision",
            Self::Remove => "Remove a provision",
            Self::Comment => "General comment",
        }
    }
}

impl std::fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContributionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AMEND" => Ok(Self::Amend),
            "ADD" => Ok(Self::Add),
            "REMOVE" => Ok(Self::Remove),
            "COMMENT" => Ok(Self::Comment),
            other => Err(ValidationError::InvalidContributionKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_roundtrip() {
        for kind in ContributionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let back: ContributionKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn parse_is_exact_match() {
        assert_eq!(
            "AMEND".parse::<ContributionKind>().unwrap(),
            ContributionKind::Amend
        );
        assert!("amend".parse::<ContributionKind>().is_err());
        assert!("EDIT".parse::<ContributionKind>().is_err());
    }
}
