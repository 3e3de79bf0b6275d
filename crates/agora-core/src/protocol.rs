//! # Protocol Numbers
//!
//! The human-readable receipt number issued at finalization:
//! `CP-<DOC>-<YYYY>-<NNNNNN>`, e.g. `CP-CEO-2026-000154`.
//!
//! This format is a bit-exact external contract. Consumers split on `-`
//! into exactly 4 tokens, so neither the `CP` prefix nor any document code
//! may contain a dash, the year is always 4 digits, and the sequence is
//! zero-padded to 6 digits (wider sequences render unpadded and still
//! round-trip).
//!
//! Parsing is strict: wrong prefix, wrong token count, a year outside
//! 2020..=2050, or a zero sequence are all rejected.

use serde::{Deserialize, Serialize};

use crate::document::DocumentCode;
use crate::error::ValidationError;

/// Earliest year a protocol can carry. Consultations predating the system
/// do not exist.
pub const MIN_PROTOCOL_YEAR: i32 = 2020;
/// Latest year a protocol can carry; bounds obvious garbage on parse.
pub const MAX_PROTOCOL_YEAR: i32 = 2050;

/// A validated protocol number.
///
/// Construction always validates; a `ProtocolNumber` that exists renders
/// to a well-formed string and parses back to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolNumber {
    document: DocumentCode,
    year: i32,
    sequence: u32,
}

impl ProtocolNumber {
    /// Build a protocol number from its components.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidProtocolNumber`] if the year is
    /// outside `2020..=2050` or the sequence is zero.
    pub fn new(document: DocumentCode, year: i32, sequence: u32) -> Result<Self, ValidationError> {
        if !(MIN_PROTOCOL_YEAR..=MAX_PROTOCOL_YEAR).contains(&year) {
            return Err(ValidationError::InvalidProtocolNumber {
                value: format!("CP-{document}-{year}-{sequence:06}"),
                reason: format!("year must be {MIN_PROTOCOL_YEAR}..={MAX_PROTOCOL_YEAR}"),
            });
        }
        if sequence == 0 {
            return Err(ValidationError::InvalidProtocolNumber {
                value: format!("CP-{document}-{year}-{sequence:06}"),
                reason: "sequence must be at least 1".to_string(),
            });
        }
        Ok(Self {
            document,
            year,
            sequence,
        })
    }

    /// The document this protocol was issued for.
    pub fn document(&self) -> DocumentCode {
        self.document
    }

    /// The issuance year (Brasília local time at finalization).
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The per-(document, year) sequence, starting at 1.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl std::fmt::Display for ProtocolNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CP-{}-{}-{:06}",
            self.document.as_str(),
            self.year,
            self.sequence
        )
    }
}

impl std::str::FromStr for ProtocolNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidProtocolNumber {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let tokens: Vec<&str> = s.split('-').collect();
        if tokens.len() != 4 {
            return Err(invalid("expected 4 dash-separated tokens"));
        }
        if tokens[0] != "CP" {
            return Err(invalid("expected CP prefix"));
        }

        let document: DocumentCode = tokens[1].parse().map_err(|_| invalid("unknown document code"))?;

        if tokens[2].len() != 4 || !tokens[2].chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("year must be 4 digits"));
        }
        let year: i32 = tokens[2].parse().map_err(|_| invalid("year must be 4 digits"))?;

        if tokens[3].is_empty() || !tokens[3].chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("sequence must be numeric"));
        }
        let sequence: u32 = tokens[3]
            .parse()
            .map_err(|_| invalid("sequence out of range"))?;

        Self::new(document, year, sequence)
    }
}

impl Serialize for ProtocolNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProtocolNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_zero_padded() {
        let number = ProtocolNumber::new(DocumentCode::Ceo, 2026, 154).unwrap();
        assert_eq!(number.to_string(), "CP-CEO-2026-000154");
    }

    #[test]
    fn renders_first_sequence() {
        let number = ProtocolNumber::new(DocumentCode::Cpeo, 2026, 1).unwrap();
        assert_eq!(number.to_string(), "CP-CPEO-2026-000001");
    }

    #[test]
    fn parse_roundtrip() {
        let number: ProtocolNumber = "CP-CEO-2026-000154".parse().unwrap();
        assert_eq!(number.document(), DocumentCode::Ceo);
        assert_eq!(number.year(), 2026);
        assert_eq!(number.sequence(), 154);
        assert_eq!(number.to_string(), "CP-CEO-2026-000154");
    }

    #[test]
    fn wide_sequence_renders_unpadded_and_roundtrips() {
        let number = ProtocolNumber::new(DocumentCode::Ceo, 2026, 1_234_567).unwrap();
        assert_eq!(number.to_string(), "CP-CEO-2026-1234567");
        let back: ProtocolNumber = number.to_string().parse().unwrap();
        assert_eq!(back, number);
    }

    #[test]
    fn splits_into_exactly_four_tokens() {
        let number = ProtocolNumber::new(DocumentCode::Ceo, 2026, 42).unwrap();
        let rendered = number.to_string();
        assert_eq!(rendered.split('-').count(), 4);
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert!("XX-CEO-2026-000001".parse::<ProtocolNumber>().is_err());
        assert!("cp-CEO-2026-000001".parse::<ProtocolNumber>().is_err());
    }

    #[test]
    fn rejects_wrong_token_count() {
        assert!("CP-CEO-2026".parse::<ProtocolNumber>().is_err());
        assert!("CP-CEO-2026-000001-7".parse::<ProtocolNumber>().is_err());
        assert!("".parse::<ProtocolNumber>().is_err());
    }

    #[test]
    fn rejects_unknown_document() {
        assert!("CP-XYZ-2026-000001".parse::<ProtocolNumber>().is_err());
    }

    #[test]
    fn rejects_year_out_of_range() {
        assert!("CP-CEO-2019-000001".parse::<ProtocolNumber>().is_err());
        assert!("CP-CEO-2051-000001".parse::<ProtocolNumber>().is_err());
        assert!("CP-CEO-26-000001".parse::<ProtocolNumber>().is_err());
        assert!(ProtocolNumber::new(DocumentCode::Ceo, 2019, 1).is_err());
    }

    #[test]
    fn rejects_zero_or_malformed_sequence() {
        assert!("CP-CEO-2026-000000".parse::<ProtocolNumber>().is_err());
        assert!("CP-CEO-2026-abc".parse::<ProtocolNumber>().is_err());
        assert!("CP-CEO-2026-+1".parse::<ProtocolNumber>().is_err());
        assert!("CP-CEO-2026-".parse::<ProtocolNumber>().is_err());
        assert!(ProtocolNumber::new(DocumentCode::Ceo, 2026, 0).is_err());
    }

    #[test]
    fn serde_uses_string_form() {
        let number = ProtocolNumber::new(DocumentCode::Ceo, 2026, 7).unwrap();
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "\"CP-CEO-2026-000007\"");
        let back: ProtocolNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, number);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn any_document() -> impl Strategy<Value = DocumentCode> {
            prop_oneof![Just(DocumentCode::Ceo), Just(DocumentCode::Cpeo)]
        }

        proptest! {
            /// Every constructible protocol number survives a render/parse
            /// round trip unchanged.
            #[test]
            fn roundtrip(
                document in any_document(),
                year in MIN_PROTOCOL_YEAR..=MAX_PROTOCOL_YEAR,
                sequence in 1u32..=u32::MAX,
            ) {
                let number = ProtocolNumber::new(document, year, sequence).unwrap();
                let parsed: ProtocolNumber = number.to_string().parse().unwrap();
                prop_assert_eq!(parsed, number);
            }
        }
    }
}
