//! # Store Errors
//!
//! Failures of the persistence layer. Duplicate-key conflicts get their
//! own variants because callers treat them as control flow: the identity
//! registry falls back to a digest lookup, the protocol issuer re-reads
//! the sequence and retries.

use thiserror::Error;

/// Error raised by a consultation store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An identity with the same national ID digest and participant kind
    /// is already registered. The caller resolves this by looking the
    /// existing identity up, never by overwriting it.
    #[error("an identity with the same national ID digest already exists")]
    DuplicateIdentityDigest,

    /// The protocol number is already issued. Raised by the unique
    /// constraint on the number column; the issuer reacts by re-reading
    /// the max sequence and retrying.
    #[error("protocol number already issued")]
    DuplicateProtocolNumber,

    /// A stored row decoded into an impossible state, such as an unknown
    /// document code or an APPROVED status without a reviewer. The store
    /// refuses to fabricate a plausible value.
    #[error("stored {entity} row is corrupt: {reason}")]
    Corrupt {
        /// Which record shape failed to decode.
        entity: &'static str,
        /// What was wrong with the row.
        reason: String,
    },

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Shorthand for [`StoreError::Corrupt`].
    pub fn corrupt(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            entity,
            reason: reason.into(),
        }
    }
}
