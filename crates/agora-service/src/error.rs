//! # Service Errors
//!
//! The error taxonomy every service operation maps into. The transport
//! layer translates these to status codes; the variants are chosen so
//! that translation needs no further inspection.
//!
//! Reviewer races are deliberately absent: a moderation decision that
//! finds its contribution already decided is a skipped outcome, not an
//! error.

use agora_core::ValidationError;
use agora_crypto::CryptoError;
use agora_store::StoreError;
use thiserror::Error;

use crate::protocol::MAX_ISSUE_ATTEMPTS;

/// Error raised by a domain service operation.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Client input failed validation. Recoverable by the caller.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Protocol issuance could not assign a unique number within the
    /// retry budget. Callers may simply try again.
    #[error("could not assign a unique protocol number after {MAX_ISSUE_ATTEMPTS} attempts")]
    IssuanceConflict,

    /// Finalize was called for an identity with no contributions on the
    /// requested document.
    #[error("no contributions to finalize for this identity and document")]
    NoContributions,

    /// A cryptographic operation failed. Internal: the transport layer
    /// logs the cause and never forwards it to the client.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A storage operation failed. Internal, same handling as crypto
    /// failures.
    #[error(transparent)]
    Store(#[from] StoreError),
}
