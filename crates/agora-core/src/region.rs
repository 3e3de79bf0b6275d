//! # Region Codes
//!
//! Two-letter federative-unit codes validated against the closed 27-entry
//! allow-list. Region is the only geographic datum the system keeps, and it
//! is public: it appears next to the display name in public listings.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The 27 federative units, alphabetical by code.
pub const REGION_CODES: [&str; 27] = [
    "AC", "AL", "AM", "AP", "BA", "CE", "DF", "ES", "GO", "MA", "MG", "MS", "MT", "PA", "PB", "PE",
    "PI", "PR", "RJ", "RN", "RO", "RR", "RS", "SC", "SE", "SP", "TO",
];

/// A validated two-letter federative-unit code, stored uppercase.
///
/// Parsing is case-insensitive (`"sp"` and `"SP"` are the same region);
/// anything outside the allow-list is a [`ValidationError::InvalidRegion`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RegionCode(String);

impl<'de> Deserialize<'de> for RegionCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl RegionCode {
    /// Create a region code, validating against the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRegion`] when the code is not one
    /// of the 27 federative units.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let upper = raw.trim().to_ascii_uppercase();
        if REGION_CODES.contains(&upper.as_str()) {
            Ok(Self(upper))
        } else {
            Err(ValidationError::InvalidRegion(raw))
        }
    }

    /// Access the uppercase two-letter code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RegionCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_entries_case_insensitive() {
        for code in REGION_CODES {
            assert!(RegionCode::new(code).is_ok());
            assert_eq!(
                RegionCode::new(code.to_ascii_lowercase()).unwrap().as_str(),
                code
            );
        }
    }

    #[test]
    fn rejects_unknown_codes() {
        for bad in ["XX", "S", "SPP", "", "US", "12"] {
            assert!(RegionCode::new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(RegionCode::new(" sp ").unwrap().as_str(), "SP");
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<RegionCode, _> = serde_json::from_str("\"RJ\"");
        assert!(ok.is_ok());
        let bad: Result<RegionCode, _> = serde_json::from_str("\"ZZ\"");
        assert!(bad.is_err());
    }

    #[test]
    fn allow_list_is_sorted_and_distinct() {
        let mut sorted = REGION_CODES.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 27);
        assert_eq!(sorted.as_slice(), REGION_CODES);
    }
}
