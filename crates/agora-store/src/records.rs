//! # Consultation Record Shapes
//!
//! The persisted forms of participants, contributions, and protocols,
//! shared by both store backends. Records carry sealed values for
//! sensitive identifiers — a plaintext CPF, CNPJ, or email never reaches
//! this layer.

use agora_core::{
    ContributionId, ContributionKind, DocumentCode, IdentityId, IndividualCategory,
    OrganizationNature, ParticipantKind, ProtocolId, ProtocolNumber, RegionCode, Timestamp,
};
use agora_crypto::SealedValue;
use agora_state::{ModerationState, ModerationStatus};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ─── Identities ──────────────────────────────────────────────────────

/// A registered participant, individual or organization.
///
/// Immutable once written: registration has no update or delete path.
/// The national ID and email are stored only as digest + ciphertext
/// pairs; `representative_id` (an organization's legal representative)
/// is sealed too but its digest is never used for lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: IdentityId,
    pub kind: ParticipantKind,
    /// Sealed CPF (individuals) or CNPJ (organizations).
    pub national_id: SealedValue,
    /// Sealed CPF of the legal representative; organizations only.
    pub representative_id: Option<SealedValue>,
    /// Sealed contact email, normalized before sealing.
    pub email: SealedValue,
    pub display_name: String,
    pub region: RegionCode,
    /// Present iff `kind` is [`ParticipantKind::Individual`].
    pub category: Option<IndividualCategory>,
    /// Present iff `kind` is [`ParticipantKind::Organization`].
    pub nature: Option<OrganizationNature>,
    /// Consent acknowledgment instant, set exactly once at creation.
    pub consent_at: Timestamp,
    pub source_ip: String,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

impl IdentityRecord {
    /// The public projection of this participant: what may appear next
    /// to published contributions and protocol lookups.
    pub fn public_ref(&self) -> ContributorRef {
        ContributorRef {
            display_name: self.display_name.clone(),
            region: self.region.clone(),
        }
    }
}

/// The publicly displayable part of a participant. Never contains an
/// identifier, an email, or any ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRef {
    pub display_name: String,
    pub region: RegionCode,
}

// ─── Contributions ───────────────────────────────────────────────────

/// One structured comment against a consultation document.
///
/// Content is frozen at submission; only the moderation state moves,
/// and it moves exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub id: ContributionId,
    pub identity_id: IdentityId,
    pub document: DocumentCode,
    pub chapter_title: String,
    pub section: Option<String>,
    /// Article label within the chapter, e.g. `"Art. 12"`.
    pub article: String,
    pub sub_item: Option<String>,
    pub kind: ContributionKind,
    pub proposed_text: String,
    pub rationale: String,
    pub moderation: ModerationState,
    pub source_ip: String,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

impl ContributionRecord {
    /// The flat moderation status of this contribution.
    pub fn status(&self) -> ModerationStatus {
        self.moderation.status()
    }

    /// Human-readable location of the comment within the document: the
    /// present parts of chapter, section, article, and sub-item joined
    /// with `" - "`.
    pub fn location_label(&self) -> String {
        let mut parts = vec![self.chapter_title.as_str()];
        if let Some(section) = &self.section {
            parts.push(section);
        }
        parts.push(&self.article);
        if let Some(sub_item) = &self.sub_item {
            parts.push(sub_item);
        }
        parts.join(" - ")
    }
}

/// One row of the public listing: an approved contribution joined with
/// its contributor's displayable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicEntry {
    pub contribution: ContributionRecord,
    pub contributor: ContributorRef,
}

// ─── Protocols ───────────────────────────────────────────────────────

/// An issued protocol: the receipt for one finalization event.
///
/// The contribution ID list is frozen at creation. Only `notified_at`
/// may be written afterwards, and only from null to a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRecord {
    pub id: ProtocolId,
    pub number: ProtocolNumber,
    pub identity_id: IdentityId,
    pub document: DocumentCode,
    /// Contributions covered by this protocol, in submission order.
    pub contribution_ids: Vec<ContributionId>,
    /// Length of `contribution_ids`, denormalized for listings.
    pub total_contributions: u32,
    /// Creation instant in Brasília local time; its year is the year
    /// component of `number`.
    pub created_at_local: DateTime<FixedOffset>,
    pub created_at_utc: Timestamp,
    /// When the outbound confirmation succeeded; set at most once.
    pub notified_at: Option<Timestamp>,
}

// ─── Queries ─────────────────────────────────────────────────────────

/// Filters for the public contribution listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicFilter {
    pub document: Option<DocumentCode>,
    /// Exact article label match.
    pub article: Option<String>,
}

/// Filters for the reviewer's pending queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingFilter {
    pub document: Option<DocumentCode>,
    pub kind: Option<ContributionKind>,
}

/// One page of a filtered listing plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching rows across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Map the page items, keeping the total.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Contribution counts by moderation status, for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl StatusCounts {
    /// Total contributions across all statuses.
    pub fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{Cpf, EmailAddress};
    use agora_crypto::FieldCipher;
    use agora_state::ModerationState;

    fn cipher() -> FieldCipher {
        FieldCipher::new("0123456789abcdef0123456789abcdef", "test-salt").unwrap()
    }

    fn sample_contribution() -> ContributionRecord {
        ContributionRecord {
            id: ContributionId::new(),
            identity_id: IdentityId::new(),
            document: DocumentCode::Ceo,
            chapter_title: "Chapter I - General Provisions".into(),
            section: None,
            article: "Art. 5".into(),
            sub_item: None,
            kind: ContributionKind::Amend,
            proposed_text: "The article should read differently.".into(),
            rationale: "The current wording is ambiguous.".into(),
            moderation: ModerationState::Pending,
            source_ip: "203.0.113.10".into(),
            user_agent: None,
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn location_label_joins_present_parts() {
        let mut record = sample_contribution();
        assert_eq!(
            record.location_label(),
            "Chapter I - General Provisions - Art. 5"
        );

        record.section = Some("Section II".into());
        record.sub_item = Some("§ 1".into());
        assert_eq!(
            record.location_label(),
            "Chapter I - General Provisions - Section II - Art. 5 - § 1"
        );
    }

    #[test]
    fn public_ref_carries_only_display_fields() {
        let cipher = cipher();
        let cpf = Cpf::new("111.444.777-35").unwrap();
        let email = EmailAddress::new("a@b.com").unwrap();
        let record = IdentityRecord {
            id: IdentityId::new(),
            kind: ParticipantKind::Individual,
            national_id: cipher.seal(cpf.as_str()).unwrap(),
            representative_id: None,
            email: cipher.seal(email.as_str()).unwrap(),
            display_name: "Ana Souza".into(),
            region: RegionCode::new("SP").unwrap(),
            category: Some(IndividualCategory::DentalSurgeon),
            nature: None,
            consent_at: Timestamp::now(),
            source_ip: "203.0.113.10".into(),
            user_agent: Some("test-agent".into()),
            created_at: Timestamp::now(),
        };

        let public = record.public_ref();
        assert_eq!(public.display_name, "Ana Souza");
        assert_eq!(public.region.as_str(), "SP");

        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains(cpf.as_str()));
        assert!(!json.contains("a@b.com"));
    }

    #[test]
    fn page_map_preserves_total() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 42,
        };
        let mapped = page.map(|n| n * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.total, 42);
    }

    #[test]
    fn status_counts_total() {
        let counts = StatusCounts {
            pending: 3,
            approved: 5,
            rejected: 2,
        };
        assert_eq!(counts.total(), 10);
    }
}
