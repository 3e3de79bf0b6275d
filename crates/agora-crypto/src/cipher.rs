//! # Field Cipher
//!
//! The single entry point for sealing and unsealing sensitive fields.
//! One [`FieldCipher`] per process, constructed from configuration at
//! startup; both the AES key and the digest salt come from it, so the
//! two representations of a plaintext can never be computed under
//! mismatched material.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, MIN_SECRET_LEN};
use crate::sealed::{EncryptedField, FieldDigest, SealedValue};

/// AES-GCM nonce length in bytes. The nonce is prepended to the
/// ciphertext before base64 encoding.
const NONCE_LEN: usize = 12;

/// HKDF info string. Versioned so a future framing change can derive a
/// distinct key from the same configured secret.
const KEY_CONTEXT: &[u8] = b"agora.field-cipher.v1";

/// Field-level cipher: salted SHA-256 digests for lookup, AES-256-GCM
/// for reversible storage.
///
/// The encryption key is derived from the configured secret via
/// HKDF-SHA256 rather than used raw, so an operator-supplied passphrase
/// of any shape yields a uniform 256-bit key.
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; 32],
    digest_salt: String,
}

impl FieldCipher {
    /// Derive a cipher from the configured secret and digest salt.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::WeakSecret`] if the secret is shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: &str, digest_salt: &str) -> Result<Self, CryptoError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(CryptoError::WeakSecret(secret.len()));
        }

        let hkdf = Hkdf::<Sha256>::new(Some(digest_salt.as_bytes()), secret.as_bytes());
        let mut key = [0u8; 32];
        hkdf.expand(KEY_CONTEXT, &mut key)
            .map_err(|_| CryptoError::KeyDerivation)?;

        Ok(Self {
            key,
            digest_salt: digest_salt.to_string(),
        })
    }

    /// Compute the deterministic lookup digest: SHA-256 over the salt
    /// followed by the plaintext, hex-encoded.
    ///
    /// Callers must pass the canonical form of the value (digits-only
    /// CPF, lowercased email); the cipher hashes exactly what it is
    /// given.
    pub fn digest(&self, plaintext: &str) -> FieldDigest {
        let mut hasher = Sha256::new();
        hasher.update(self.digest_salt.as_bytes());
        hasher.update(plaintext.as_bytes());
        FieldDigest::from_computed(hex::encode(hasher.finalize()))
    }

    /// Encrypt a plaintext for reversible storage.
    ///
    /// A fresh random nonce is drawn per call, so repeated encryptions
    /// of the same plaintext are unlinkable. The transport form is
    /// base64 over `nonce ‖ ciphertext ‖ tag`.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedField, CryptoError> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::EncryptionFailed)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut framed = nonce_bytes.to_vec();
        framed.extend_from_slice(&ciphertext);
        Ok(EncryptedField::from_computed(BASE64.encode(framed)))
    }

    /// Decrypt a stored ciphertext back to its plaintext.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::MalformedCiphertext`] if the base64 or nonce
    ///   framing is unreadable.
    /// - [`CryptoError::DecryptionFailed`] if authentication fails: the
    ///   blob was tampered with or produced under a different key.
    /// - [`CryptoError::NotUtf8`] if the recovered bytes are not a
    ///   string.
    pub fn decrypt(&self, field: &EncryptedField) -> Result<String, CryptoError> {
        let framed = BASE64
            .decode(field.as_str())
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;

        if framed.len() < NONCE_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "framing requires at least {NONCE_LEN} bytes, got {}",
                framed.len()
            )));
        }

        let nonce_bytes: [u8; NONCE_LEN] = framed[..NONCE_LEN]
            .try_into()
            .map_err(|_| CryptoError::MalformedCiphertext("bad nonce framing".to_string()))?;
        let nonce = Nonce::from(nonce_bytes);

        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::DecryptionFailed)?;
        let plaintext = cipher
            .decrypt(&nonce, &framed[NONCE_LEN..])
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::NotUtf8)
    }

    /// Seal a plaintext into its paired storage representation.
    ///
    /// This is the only write-path constructor for [`SealedValue`]:
    /// digest and ciphertext are derived from the same plaintext in one
    /// call.
    pub fn seal(&self, plaintext: &str) -> Result<SealedValue, CryptoError> {
        let digest = self.digest(plaintext);
        let ciphertext = self.encrypt(plaintext)?;
        Ok(SealedValue::from_cipher(digest, ciphertext))
    }

    /// Decrypt the ciphertext half of a sealed value.
    pub fn reveal(&self, sealed: &SealedValue) -> Result<String, CryptoError> {
        self.decrypt(sealed.ciphertext())
    }
}

// Key material must never leak through debug formatting.
impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("key", &"[redacted]")
            .field("digest_salt", &"[redacted]")
            .finish()
    }
}
