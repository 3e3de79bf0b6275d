//! # Consultation Documents
//!
//! The closed set of regulatory documents open for public comment. The
//! document code is part of the protocol number contract
//! (`CP-<DOC>-<YYYY>-<NNNNNN>`), so codes contain no `-` and never change
//! once published.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A regulatory document under public consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCode {
    /// Code of Ethics.
    #[serde(rename = "CEO")]
    Ceo,
    /// Code of Ethical Procedure.
    #[serde(rename = "CPEO")]
    Cpeo,
}

impl DocumentCode {
    /// Every document currently open for consultation.
    pub const ALL: [DocumentCode; 2] = [DocumentCode::Ceo, DocumentCode::Cpeo];

    /// The wire/storage code. Also the `<DOC>` token of protocol numbers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ceo => "CEO",
            Self::Cpeo => "CPEO",
        }
    }

    /// Human-readable document title for notifications and listings.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Ceo => "Code of Ethics",
            Self::Cpeo => "Code of Ethical Procedure",
        }
    }
}

impl std::fmt::Display for DocumentCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CEO" => Ok(Self::Ceo),
            "CPEO" => Ok(Self::Cpeo),
            other => Err(ValidationError::InvalidDocument(other.to_string())),
        }
    }
}
