//! # Validation Errors
//!
//! The single error type for input validation across the stack. All
//! validated constructors in this crate (and the bound checks in the
//! service layer) return `ValidationError`; callers can surface it
//! directly as a client error.
//!
//! ## Design
//!
//! - Variants for non-sensitive inputs (region codes, document codes,
//!   protocol numbers) embed the offending value for diagnostics.
//! - Variants for sensitive inputs (national IDs, email addresses) embed
//!   only the *reason* the input was rejected. A rejected CPF is still a
//!   CPF-shaped secret; it must never reach a log line.

use thiserror::Error;

/// A client input failed validation. Fully recoverable: the caller can
/// retry with corrected input. Nothing is persisted before validation
/// passes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// CPF (individual national ID) failed format or check-digit
    /// validation. Carries the reason, never the value.
    #[error("invalid CPF: {0}")]
    InvalidCpf(String),

    /// CNPJ (organization national ID) failed format or check-digit
    /// validation. Carries the reason, never the value.
    #[error("invalid CNPJ: {0}")]
    InvalidCnpj(String),

    /// Email address failed shape validation. Carries the reason, never
    /// the value.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Region code is not one of the 27 federative units.
    #[error("unknown region code: {0:?}")]
    InvalidRegion(String),

    /// Document code is not part of the consultation document set.
    #[error("unknown document code: {0:?}")]
    InvalidDocument(String),

    /// Participant kind is neither INDIVIDUAL nor ORGANIZATION.
    #[error("unknown participant kind: {0:?}")]
    InvalidParticipantKind(String),

    /// Individual category is not part of the closed category set.
    #[error("unknown individual category: {0:?}")]
    InvalidCategory(String),

    /// Organization nature is not part of the closed nature set.
    #[error("unknown organization nature: {0:?}")]
    InvalidNature(String),

    /// Contribution kind is not part of the closed kind set.
    #[error("unknown contribution kind: {0:?}")]
    InvalidContributionKind(String),

    /// Reviewer role name is not part of the closed role set.
    #[error("unknown reviewer role: {0:?}")]
    InvalidRole(String),

    /// Moderation status string is not PENDING, APPROVED, or REJECTED.
    #[error("unknown moderation status: {0:?}")]
    InvalidModerationStatus(String),

    /// Moderation action string is not APPROVE or REJECT.
    #[error("unknown moderation action: {0:?}")]
    InvalidModerationAction(String),

    /// A protocol number string did not match the
    /// `CP-<DOC>-<YYYY>-<NNNNNN>` contract.
    #[error("invalid protocol number {value:?}: {reason}")]
    InvalidProtocolNumber {
        /// The rejected string.
        value: String,
        /// Which part of the contract it violated.
        reason: String,
    },

    /// A free-text field violated its length bounds.
    #[error("{field} must be {min}..={max} characters, got {len}")]
    TextLength {
        /// The field that violated its bounds.
        field: &'static str,
        /// Minimum accepted length in characters.
        min: usize,
        /// Maximum accepted length in characters.
        max: usize,
        /// Actual length of the submitted value.
        len: usize,
    },

    /// A batch operation received an out-of-bounds ID list.
    #[error("batch must contain {min}..={max} ids, got {len}")]
    BatchSize {
        /// Number of IDs submitted.
        len: usize,
        /// Minimum batch size.
        min: usize,
        /// Maximum batch size.
        max: usize,
    },

    /// A timestamp string could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Check a free-text field against inclusive character-count bounds.
///
/// Counts characters, not bytes: a contribution written in Portuguese
/// must not lose budget to accented letters.
///
/// # Errors
///
/// Returns [`ValidationError::TextLength`] naming the field and bounds.
pub fn check_text_bounds(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::TextLength {
            field,
            min,
            max,
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_bounds_count_characters_not_bytes() {
        // "ção" is 3 characters, 5 bytes.
        assert!(check_text_bounds("field", "ção", 3, 3).is_ok());
        let err = check_text_bounds("field", "ção", 4, 10).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TextLength {
                field: "field",
                min: 4,
                max: 10,
                len: 3
            }
        );
    }

    #[test]
    fn text_bounds_inclusive() {
        assert!(check_text_bounds("f", "abc", 3, 5).is_ok());
        assert!(check_text_bounds("f", "abcde", 3, 5).is_ok());
        assert!(check_text_bounds("f", "ab", 3, 5).is_err());
        assert!(check_text_bounds("f", "abcdef", 3, 5).is_err());
    }
}
