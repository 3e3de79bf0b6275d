//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the Agora stack.
//! Each identifier is a distinct type — you cannot pass a [`ContributionId`]
//! where a [`ProtocolId`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`Cpf`], [`Cnpj`], [`EmailAddress`]) validate
//! format at construction time, including full check-digit verification for
//! the national registries. UUID-based identifiers ([`IdentityId`],
//! [`ContributionId`], [`ProtocolId`], [`ReviewerId`]) are always valid by
//! construction.
//!
//! ## Sensitive-value hygiene
//!
//! `Cpf`, `Cnpj`, and `EmailAddress` are the plaintexts the crypto layer
//! exists to protect. They implement `Display` and `Debug` as *masked*
//! renditions and deliberately do not implement `Serialize`; the canonical
//! value leaves the type only through [`Cpf::as_str`] (and siblings) at the
//! sealing or notification call site.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Helper macro to implement `Deserialize` for string newtypes that must
/// validate their contents. Deserializes as a plain `String`, then routes
/// through the type's `new()` constructor so that invalid values are
/// rejected at deserialization time — not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Helper macro for UUID-backed identifier newtypes: random constructor,
/// UUID accessors, namespaced `Display` (`identity:<uuid>`), and a
/// `FromStr` that accepts both the namespaced and the bare form.
macro_rules! impl_uuid_id {
    ($ty:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::from_str(raw).map(Self)
            }
        }
    };
}

impl_uuid_id!(
    IdentityId,
    "identity",
    "A unique identifier for a registered participant (individual or organization)."
);
impl_uuid_id!(
    ContributionId,
    "contribution",
    "A unique identifier for a single structured contribution."
);
impl_uuid_id!(
    ProtocolId,
    "protocol",
    "A unique identifier for a finalization protocol (receipt)."
);
impl_uuid_id!(
    ReviewerId,
    "reviewer",
    "A unique identifier for a privileged reviewer account."
);

// ---------------------------------------------------------------------------
// National identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// Brazilian individual taxpayer registry number (CPF).
///
/// First-class identifier for participant registration. The canonical
/// storage format is 11 digits without punctuation. The constructor
/// accepts both:
/// - `"11144477735"` (11 digits)
/// - `"111.444.777-35"` (formatted)
///
/// # Validation
///
/// - Must contain exactly 11 digits after stripping non-digit characters
/// - All-same-digit sequences are rejected (they satisfy the checksum but
///   are not assigned)
/// - Both mod-11 check digits must verify
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cpf(String);

impl_validating_deserialize!(Cpf);

impl Cpf {
    /// Create a CPF from a string value, validating the check digits.
    ///
    /// Accepts formatted and unformatted input; stores the canonical
    /// 11-digit form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCpf`] with the rejection reason
    /// (never the offending value).
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() != 11 {
            return Err(ValidationError::InvalidCpf(format!(
                "must contain 11 digits, got {}",
                digits.len()
            )));
        }
        if all_same_digit(&digits) {
            return Err(ValidationError::InvalidCpf(
                "repeated-digit sequence".to_string(),
            ));
        }

        let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();

        let first = check_digit(d.iter().take(9).enumerate().map(|(i, v)| v * (10 - i as u32)));
        if d[9] != first {
            return Err(ValidationError::InvalidCpf(
                "first check digit mismatch".to_string(),
            ));
        }

        let second = check_digit(d.iter().take(10).enumerate().map(|(i, v)| v * (11 - i as u32)));
        if d[10] != second {
            return Err(ValidationError::InvalidCpf(
                "second check digit mismatch".to_string(),
            ));
        }

        Ok(Self(digits))
    }

    /// Access the CPF in canonical 11-digit form (no punctuation).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the CPF in formatted form: `XXX.XXX.XXX-XX`.
    pub fn formatted(&self) -> String {
        format!(
            "{}.{}.{}-{}",
            &self.0[..3],
            &self.0[3..6],
            &self.0[6..9],
            &self.0[9..]
        )
    }

    /// Return the masked rendition safe for logs and public display:
    /// `XXX.***.***-XX`.
    pub fn masked(&self) -> String {
        format!("{}.***.***-{}", &self.0[..3], &self.0[9..])
    }
}

impl std::fmt::Display for Cpf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

impl std::fmt::Debug for Cpf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cpf({})", self.masked())
    }
}

/// Brazilian legal-entity registry number (CNPJ).
///
/// First-class identifier for organization registration. Canonical storage
/// is 14 digits without punctuation; the constructor also accepts the
/// `"11.222.333/0001-81"` formatted form.
///
/// # Validation
///
/// - Must contain exactly 14 digits after stripping non-digit characters
/// - All-same-digit sequences are rejected
/// - Both weighted mod-11 check digits must verify
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cnpj(String);

impl_validating_deserialize!(Cnpj);

/// Check-digit weights for the first CNPJ verification digit.
const CNPJ_WEIGHTS_FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
/// Check-digit weights for the second CNPJ verification digit.
const CNPJ_WEIGHTS_SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

impl Cnpj {
    /// Create a CNPJ from a string value, validating the check digits.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCnpj`] with the rejection reason
    /// (never the offending value).
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() != 14 {
            return Err(ValidationError::InvalidCnpj(format!(
                "must contain 14 digits, got {}",
                digits.len()
            )));
        }
        if all_same_digit(&digits) {
            return Err(ValidationError::InvalidCnpj(
                "repeated-digit sequence".to_string(),
            ));
        }

        let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();

        let first = check_digit(d.iter().zip(CNPJ_WEIGHTS_FIRST).map(|(v, w)| v * w));
        if d[12] != first {
            return Err(ValidationError::InvalidCnpj(
                "first check digit mismatch".to_string(),
            ));
        }

        let second = check_digit(d.iter().zip(CNPJ_WEIGHTS_SECOND).map(|(v, w)| v * w));
        if d[13] != second {
            return Err(ValidationError::InvalidCnpj(
                "second check digit mismatch".to_string(),
            ));
        }

        Ok(Self(digits))
    }

    /// Access the CNPJ in canonical 14-digit form (no punctuation).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the CNPJ in formatted form: `XX.XXX.XXX/XXXX-XX`.
    pub fn formatted(&self) -> String {
        format!(
            "{}.{}.{}/{}-{}",
            &self.0[..2],
            &self.0[2..5],
            &self.0[5..8],
            &self.0[8..12],
            &self.0[12..]
        )
    }

    /// Return the masked rendition safe for logs and public display:
    /// `XX.***.***/****-XX`.
    pub fn masked(&self) -> String {
        format!("{}.***.***/****-{}", &self.0[..2], &self.0[12..])
    }
}

impl std::fmt::Display for Cnpj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

impl std::fmt::Debug for Cnpj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cnpj({})", self.masked())
    }
}

/// Compute a mod-11 check digit from a weighted digit sum.
///
/// Remainders below 2 map to digit 0; anything else maps to `11 - remainder`.
fn check_digit(weighted: impl Iterator<Item = u32>) -> u32 {
    let remainder = weighted.sum::<u32>() % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

/// True when every character of a digit string equals the first.
fn all_same_digit(digits: &str) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Contact email (validated + normalized at construction)
// ---------------------------------------------------------------------------

/// A contact email address, normalized for digest stability.
///
/// Normalization: surrounding whitespace trimmed, lowered to ASCII
/// lowercase. The same mailbox typed with different casing must produce
/// the same digest, so normalization happens *before* the value reaches
/// the crypto layer.
///
/// # Validation
///
/// - At most 255 characters after normalization
/// - Exactly one `@` with a non-empty local part of `[a-z0-9._%+-]`
/// - Domain of `[a-z0-9.-]` labels with a final label of 2+ letters
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl_validating_deserialize!(EmailAddress);

impl EmailAddress {
    /// Create an email address, normalizing and validating shape.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmail`] with the rejection reason
    /// (never the offending value).
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let normalized = value.into().trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(ValidationError::InvalidEmail("empty".to_string()));
        }
        if normalized.len() > 255 {
            return Err(ValidationError::InvalidEmail(format!(
                "exceeds 255 characters ({})",
                normalized.len()
            )));
        }

        let (local, domain) = match normalized.split_once('@') {
            Some(parts) => parts,
            None => {
                return Err(ValidationError::InvalidEmail(
                    "missing @ separator".to_string(),
                ))
            }
        };

        if local.is_empty()
            || !local
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
        {
            return Err(ValidationError::InvalidEmail(
                "malformed local part".to_string(),
            ));
        }

        let valid_domain = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
            && domain
                .rsplit('.')
                .next()
                .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));
        if !valid_domain {
            return Err(ValidationError::InvalidEmail(
                "malformed domain".to_string(),
            ));
        }

        Ok(Self(normalized))
    }

    /// Access the normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the masked rendition safe for logs: `a***@example.com`.
    pub fn masked(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) => format!("{}***@{}", &local[..1], domain),
            None => "***".to_string(),
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

impl std::fmt::Debug for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmailAddress({})", self.masked())
    }
}
