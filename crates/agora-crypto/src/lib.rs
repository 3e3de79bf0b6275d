//! # agora-crypto — Field-Level Cryptography
//!
//! Provides the dual representation every sensitive identifier is stored
//! under:
//!
//! - **Lookup digest** — deterministic salted SHA-256, hex-encoded. Used as
//!   a unique key for exact-match search without exposing the value.
//! - **Reversible ciphertext** — AES-256-GCM with a random per-call nonce,
//!   base64-encoded. Used only for authorized display after a record has
//!   already been located by digest or surrogate ID.
//!
//! The two representations must always agree on the underlying plaintext.
//! [`SealedValue`] makes divergence unrepresentable on the write path: it
//! can only be produced by [`FieldCipher::seal`], which derives both parts
//! from one plaintext.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `agora-*` crates.
//! - No global or ambient key material: a [`FieldCipher`] is constructed
//!   explicitly from configuration and injected where needed.
//! - No mocking of cryptographic operations in tests — all tests use real
//!   SHA-256 and real AES-256-GCM.
//! - Decryption failures are loud. Corrupted or foreign ciphertext never
//!   yields garbage or an empty default.

pub mod cipher;
pub mod error;
pub mod sealed;

pub use cipher::FieldCipher;
pub use error::CryptoError;
pub use sealed::{EncryptedField, FieldDigest, SealedValue};
