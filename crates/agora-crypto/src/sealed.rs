//! # Sealed Field Representations
//!
//! The storage-facing types for sensitive identifiers: the lookup digest,
//! the reversible ciphertext, and the [`SealedValue`] pair that binds them
//! to one plaintext.

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Hex length of a SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A salted SHA-256 lookup digest, 64 lowercase hex characters.
///
/// Deterministic per plaintext (the salt is application-wide), so it can
/// serve as a unique storage key for exact-match search. The digest is
/// one-way; it never reveals the value it indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDigest(String);

impl FieldDigest {
    /// Wrap freshly computed digest hex. Crate-internal: new digests only
    /// come out of [`crate::FieldCipher::digest`].
    pub(crate) fn from_computed(hex: String) -> Self {
        Self(hex)
    }

    /// Rehydrate a digest from storage.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedDigest`] unless the input is exactly
    /// 64 lowercase hex characters. Uppercase is rejected — digests are
    /// compared as strings, and a case mismatch would silently never match.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, CryptoError> {
        let hex = hex.into();
        if hex.len() != DIGEST_HEX_LEN {
            return Err(CryptoError::MalformedDigest(format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                hex.len()
            )));
        }
        if !hex
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(CryptoError::MalformedDigest(
                "expected lowercase hex".to_string(),
            ));
        }
        Ok(Self(hex))
    }

    /// The digest as lowercase hex.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An AES-256-GCM ciphertext in transport form: base64 over
/// `nonce ‖ ciphertext ‖ tag`.
///
/// Never used for lookup — only for authorized display through
/// [`crate::FieldCipher::decrypt`]. Two encryptions of the same plaintext
/// produce different `EncryptedField`s (fresh nonce per call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField(String);

impl EncryptedField {
    /// Wrap freshly produced ciphertext. Crate-internal: new ciphertexts
    /// only come out of [`crate::FieldCipher::encrypt`].
    pub(crate) fn from_computed(b64: String) -> Self {
        Self(b64)
    }

    /// Rehydrate a ciphertext from storage. Framing is validated at
    /// decrypt time, not here: a tampered blob must fail the
    /// authentication check loudly rather than be rejected quietly on
    /// load.
    pub fn from_stored(b64: impl Into<String>) -> Self {
        Self(b64.into())
    }

    /// The base64 transport form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The paired storage representation of one sensitive plaintext.
///
/// Both parts are derived from the same plaintext in one
/// [`crate::FieldCipher::seal`] call; there is no constructor that accepts
/// the parts independently on the write path. The invariant
/// `digest(plaintext) == digest(decrypt(ciphertext))` therefore holds by
/// construction for every sealed value this process creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    digest: FieldDigest,
    ciphertext: EncryptedField,
}

impl SealedValue {
    /// Crate-internal pairing constructor used by `seal`.
    pub(crate) fn from_cipher(digest: FieldDigest, ciphertext: EncryptedField) -> Self {
        Self { digest, ciphertext }
    }

    /// Rehydrate a sealed value from storage columns.
    ///
    /// The persistence layer is the trust boundary here: rows were written
    /// through `seal`, so their columns are assumed paired.
    pub fn from_stored(digest: FieldDigest, ciphertext: EncryptedField) -> Self {
        Self { digest, ciphertext }
    }

    /// The lookup digest.
    pub fn digest(&self) -> &FieldDigest {
        &self.digest
    }

    /// The reversible ciphertext.
    pub fn ciphertext(&self) -> &EncryptedField {
        &self.ciphertext
    }
}
