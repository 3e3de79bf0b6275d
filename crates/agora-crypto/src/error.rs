//! # Crypto Errors
//!
//! Failures in field-level cryptography. All are fatal to the calling
//! operation: no partial write of one representation without the other,
//! and no silent fallback from ciphertext to plaintext.

use thiserror::Error;

/// Minimum accepted length for the configured secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Error in field-level cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The configured secret is too short to derive a key from.
    #[error("configured secret must be at least {MIN_SECRET_LEN} bytes, got {0}")]
    WeakSecret(usize),

    /// Key derivation failed.
    #[error("key derivation failed")]
    KeyDerivation,

    /// Encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Stored ciphertext is not decodable (bad base64, truncated framing).
    #[error("ciphertext malformed: {0}")]
    MalformedCiphertext(String),

    /// Authenticated decryption failed: the ciphertext was produced with a
    /// different key or has been tampered with.
    #[error("decryption failed: ciphertext unreadable with current key")]
    DecryptionFailed,

    /// Decrypted bytes are not valid UTF-8. Sealed fields are always
    /// strings; this indicates foreign ciphertext.
    #[error("decrypted payload is not valid UTF-8")]
    NotUtf8,

    /// A stored digest string is not 64 lowercase hex characters.
    #[error("digest malformed: {0}")]
    MalformedDigest(String),
}
