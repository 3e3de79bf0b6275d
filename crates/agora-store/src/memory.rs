//! # In-Memory Store
//!
//! A process-local consultation store backed by `parking_lot::RwLock`
//! tables. It upholds the same contracts as the PostgreSQL backend —
//! unique national ID digest per participant kind, unique protocol
//! number, atomic moderation decisions — so service-level tests and the
//! API's in-memory mode observe identical semantics. Nothing survives a
//! restart.

use std::collections::HashMap;
use std::sync::Arc;

use agora_core::{
    ContributionId, DocumentCode, IdentityId, ParticipantKind, ProtocolId, ProtocolNumber,
    Timestamp,
};
use agora_crypto::FieldDigest;
use agora_state::{Decided, ModerationRecord};
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::records::{
    ContributionRecord, IdentityRecord, Page, PendingFilter, ProtocolRecord, PublicEntry,
    PublicFilter, StatusCounts,
};

#[derive(Default)]
struct Tables {
    identities: HashMap<IdentityId, IdentityRecord>,
    digest_index: HashMap<(ParticipantKind, FieldDigest), IdentityId>,
    contributions: HashMap<ContributionId, ContributionRecord>,
    moderation_log: Vec<ModerationRecord>,
    protocols: HashMap<ProtocolId, ProtocolRecord>,
    number_index: HashMap<String, ProtocolId>,
}

/// Process-local store; cheap to clone, all clones share the tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Identities ──────────────────────────────────────────────────

    /// Insert a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateIdentityDigest`] when an identity
    /// with the same kind and national ID digest already exists.
    pub fn insert_identity(&self, record: IdentityRecord) -> Result<(), StoreError> {
        let mut tables = self.inner.write();
        let key = (record.kind, record.national_id.digest().clone());
        if tables.digest_index.contains_key(&key) {
            return Err(StoreError::DuplicateIdentityDigest);
        }
        tables.digest_index.insert(key, record.id);
        tables.identities.insert(record.id, record);
        Ok(())
    }

    /// Fetch an identity by ID.
    pub fn identity_by_id(&self, id: IdentityId) -> Option<IdentityRecord> {
        self.inner.read().identities.get(&id).cloned()
    }

    /// Fetch an identity by national ID digest and kind.
    pub fn identity_by_digest(
        &self,
        kind: ParticipantKind,
        digest: &FieldDigest,
    ) -> Option<IdentityRecord> {
        let tables = self.inner.read();
        let id = tables.digest_index.get(&(kind, digest.clone()))?;
        tables.identities.get(id).cloned()
    }

    /// Number of registered identities.
    pub fn count_identities(&self) -> u64 {
        self.inner.read().identities.len() as u64
    }

    // ─── Contributions ───────────────────────────────────────────────

    /// Insert a new contribution.
    pub fn insert_contribution(&self, record: ContributionRecord) {
        self.inner.write().contributions.insert(record.id, record);
    }

    /// Fetch a contribution by ID.
    pub fn contribution_by_id(&self, id: ContributionId) -> Option<ContributionRecord> {
        self.inner.read().contributions.get(&id).cloned()
    }

    /// Fetch contributions by ID, in the order given. Missing IDs are
    /// skipped with a warning; they indicate a broken reference.
    pub fn contributions_by_ids(&self, ids: &[ContributionId]) -> Vec<ContributionRecord> {
        let tables = self.inner.read();
        ids.iter()
            .filter_map(|id| {
                let found = tables.contributions.get(id).cloned();
                if found.is_none() {
                    tracing::warn!(contribution_id = %id, "referenced contribution missing");
                }
                found
            })
            .collect()
    }

    /// All contributions by one identity, optionally narrowed to a
    /// document, newest first.
    pub fn contributions_by_identity(
        &self,
        identity_id: IdentityId,
        document: Option<DocumentCode>,
    ) -> Vec<ContributionRecord> {
        let tables = self.inner.read();
        let mut records: Vec<ContributionRecord> = tables
            .contributions
            .values()
            .filter(|c| c.identity_id == identity_id)
            .filter(|c| document.map_or(true, |d| c.document == d))
            .cloned()
            .collect();
        sort_newest_first(&mut records);
        records
    }

    /// IDs of all contributions by one identity for one document, in
    /// submission order. This is the list a protocol freezes.
    pub fn contribution_ids_for(
        &self,
        identity_id: IdentityId,
        document: DocumentCode,
    ) -> Vec<ContributionId> {
        let tables = self.inner.read();
        let mut records: Vec<&ContributionRecord> = tables
            .contributions
            .values()
            .filter(|c| c.identity_id == identity_id && c.document == document)
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        records.into_iter().map(|c| c.id).collect()
    }

    /// One page of the public listing: APPROVED contributions only,
    /// newest first, joined with the contributor's display fields.
    pub fn list_public(&self, filter: &PublicFilter, limit: i64, offset: i64) -> Page<PublicEntry> {
        use agora_state::ModerationStatus;

        let tables = self.inner.read();
        let mut records: Vec<ContributionRecord> = tables
            .contributions
            .values()
            .filter(|c| c.status() == ModerationStatus::Approved)
            .filter(|c| filter.document.map_or(true, |d| c.document == d))
            .filter(|c| {
                filter
                    .article
                    .as_ref()
                    .map_or(true, |article| c.article == *article)
            })
            .cloned()
            .collect();
        sort_newest_first(&mut records);

        let total = records.len() as u64;
        let items = paginate(records, limit, offset)
            .into_iter()
            .filter_map(|contribution| {
                let identity = tables.identities.get(&contribution.identity_id);
                if identity.is_none() {
                    tracing::warn!(
                        contribution_id = %contribution.id,
                        "contribution references a missing identity"
                    );
                }
                identity.map(|identity| PublicEntry {
                    contributor: identity.public_ref(),
                    contribution,
                })
            })
            .collect();
        Page { items, total }
    }

    /// One page of the reviewer queue: PENDING contributions, oldest
    /// first.
    pub fn pending_queue(
        &self,
        filter: &PendingFilter,
        limit: i64,
        offset: i64,
    ) -> Page<ContributionRecord> {
        let tables = self.inner.read();
        let mut records: Vec<ContributionRecord> = tables
            .contributions
            .values()
            .filter(|c| c.moderation.is_pending())
            .filter(|c| filter.document.map_or(true, |d| c.document == d))
            .filter(|c| filter.kind.map_or(true, |k| c.kind == k))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });

        let total = records.len() as u64;
        let items = paginate(records, limit, offset);
        Page { items, total }
    }

    /// Contribution counts by moderation status.
    pub fn contribution_status_counts(&self) -> StatusCounts {
        use agora_state::ModerationStatus;

        let tables = self.inner.read();
        let mut counts = StatusCounts::default();
        for contribution in tables.contributions.values() {
            match contribution.status() {
                ModerationStatus::Pending => counts.pending += 1,
                ModerationStatus::Approved => counts.approved += 1,
                ModerationStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    // ─── Moderation ──────────────────────────────────────────────────

    /// Apply a moderation decision atomically: status transition and
    /// audit record land under one write lock.
    ///
    /// Returns `false` without writing anything when the contribution is
    /// missing or no longer PENDING — the caller lost a reviewer race.
    pub fn apply_decision(&self, decided: &Decided) -> bool {
        let mut tables = self.inner.write();
        let Some(contribution) = tables
            .contributions
            .get_mut(&decided.record.contribution_id)
        else {
            return false;
        };
        if !contribution.moderation.is_pending() {
            return false;
        }
        contribution.moderation = decided.state.clone();
        tables.moderation_log.push(decided.record.clone());
        true
    }

    /// Chronological moderation history of one contribution.
    pub fn moderation_history(&self, id: ContributionId) -> Vec<ModerationRecord> {
        self.inner
            .read()
            .moderation_log
            .iter()
            .filter(|record| record.contribution_id == id)
            .cloned()
            .collect()
    }

    // ─── Protocols ───────────────────────────────────────────────────

    /// Highest issued sequence for `(document, year)`, or 0 when none.
    pub fn max_protocol_sequence(&self, document: DocumentCode, year: i32) -> u32 {
        self.inner
            .read()
            .protocols
            .values()
            .filter(|p| p.number.document() == document && p.number.year() == year)
            .map(|p| p.number.sequence())
            .max()
            .unwrap_or(0)
    }

    /// Insert a new protocol.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateProtocolNumber`] when the number is
    /// already issued; the check and the insert share one lock scope.
    pub fn insert_protocol(&self, record: ProtocolRecord) -> Result<(), StoreError> {
        let mut tables = self.inner.write();
        let number = record.number.to_string();
        if tables.number_index.contains_key(&number) {
            return Err(StoreError::DuplicateProtocolNumber);
        }
        tables.number_index.insert(number, record.id);
        tables.protocols.insert(record.id, record);
        Ok(())
    }

    /// Fetch a protocol by ID.
    pub fn protocol_by_id(&self, id: ProtocolId) -> Option<ProtocolRecord> {
        self.inner.read().protocols.get(&id).cloned()
    }

    /// Fetch a protocol by its public number.
    pub fn protocol_by_number(&self, number: &ProtocolNumber) -> Option<ProtocolRecord> {
        let tables = self.inner.read();
        let id = tables.number_index.get(&number.to_string())?;
        tables.protocols.get(id).cloned()
    }

    /// Set `notified_at` if unset, returning the effective value.
    ///
    /// Idempotent: a protocol already marked keeps its original
    /// timestamp. `None` means the protocol does not exist.
    pub fn mark_notified(&self, id: ProtocolId, at: Timestamp) -> Option<Timestamp> {
        let mut tables = self.inner.write();
        let protocol = tables.protocols.get_mut(&id)?;
        match protocol.notified_at {
            Some(existing) => Some(existing),
            None => {
                protocol.notified_at = Some(at);
                Some(at)
            }
        }
    }

    /// Number of issued protocols.
    pub fn count_protocols(&self) -> u64 {
        self.inner.read().protocols.len() as u64
    }
}

fn sort_newest_first(records: &mut [ContributionRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
    });
}

fn paginate<T>(records: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    records.into_iter().skip(offset).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{ContributionKind, IndividualCategory, RegionCode, ReviewerId};
    use agora_crypto::FieldCipher;
    use agora_state::{Decision, ModerationState};

    fn cipher() -> FieldCipher {
        FieldCipher::new("0123456789abcdef0123456789abcdef", "memory-tests").unwrap()
    }

    fn individual(cpf: &str, email: &str) -> IdentityRecord {
        let cipher = cipher();
        IdentityRecord {
            id: IdentityId::new(),
            kind: ParticipantKind::Individual,
            national_id: cipher.seal(cpf).unwrap(),
            representative_id: None,
            email: cipher.seal(email).unwrap(),
            display_name: "Ana Souza".into(),
            region: RegionCode::new("SP").unwrap(),
            category: Some(IndividualCategory::DentalSurgeon),
            nature: None,
            consent_at: Timestamp::now(),
            source_ip: "203.0.113.10".into(),
            user_agent: None,
            created_at: Timestamp::now(),
        }
    }

    fn contribution(identity_id: IdentityId, document: DocumentCode) -> ContributionRecord {
        ContributionRecord {
            id: ContributionId::new(),
            identity_id,
            document,
            chapter_title: "Chapter I".into(),
            section: None,
            article: "Art. 1".into(),
            sub_item: None,
            kind: ContributionKind::Comment,
            proposed_text: "A suggestion of adequate length.".into(),
            rationale: "A rationale of adequate length.".into(),
            moderation: ModerationState::Pending,
            source_ip: "203.0.113.10".into(),
            user_agent: None,
            created_at: Timestamp::now(),
        }
    }

    fn protocol(document: DocumentCode, year: i32, sequence: u32) -> ProtocolRecord {
        let now = Timestamp::now();
        ProtocolRecord {
            id: ProtocolId::new(),
            number: ProtocolNumber::new(document, year, sequence).unwrap(),
            identity_id: IdentityId::new(),
            document,
            contribution_ids: vec![ContributionId::new()],
            total_contributions: 1,
            created_at_local: now.to_brasilia(),
            created_at_utc: now,
            notified_at: None,
        }
    }

    #[test]
    fn duplicate_digest_rejected() {
        let store = MemoryStore::new();
        store
            .insert_identity(individual("11144477735", "a@b.com"))
            .unwrap();

        // Same CPF sealed again: fresh ciphertext, same digest.
        let err = store
            .insert_identity(individual("11144477735", "c@d.com"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentityDigest));
        assert_eq!(store.count_identities(), 1);
    }

    #[test]
    fn digest_lookup_finds_registered_identity() {
        let store = MemoryStore::new();
        let record = individual("11144477735", "a@b.com");
        let digest = record.national_id.digest().clone();
        let id = record.id;
        store.insert_identity(record).unwrap();

        let found = store
            .identity_by_digest(ParticipantKind::Individual, &digest)
            .unwrap();
        assert_eq!(found.id, id);
        assert!(store
            .identity_by_digest(ParticipantKind::Organization, &digest)
            .is_none());
    }

    #[test]
    fn apply_decision_writes_once() {
        let store = MemoryStore::new();
        let identity = individual("11144477735", "a@b.com");
        let identity_id = identity.id;
        store.insert_identity(identity).unwrap();
        let record = contribution(identity_id, DocumentCode::Ceo);
        let contribution_id = record.id;
        store.insert_contribution(record);

        let reviewer = ReviewerId::new();
        let approve = ModerationState::Pending
            .apply(contribution_id, reviewer, Decision::Approve)
            .unwrap();
        let reject = ModerationState::Pending
            .apply(
                contribution_id,
                reviewer,
                Decision::reject("duplicate submission").unwrap(),
            )
            .unwrap();

        assert!(store.apply_decision(&approve));
        assert!(!store.apply_decision(&reject));

        let history = store.moderation_history(contribution_id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, agora_state::ModerationAction::Approve);
        let stored = store.contribution_by_id(contribution_id).unwrap();
        assert_eq!(stored.moderation, approve.state);
    }

    #[test]
    fn apply_decision_missing_contribution_is_noop() {
        let store = MemoryStore::new();
        let decided = ModerationState::Pending
            .apply(ContributionId::new(), ReviewerId::new(), Decision::Approve)
            .unwrap();
        assert!(!store.apply_decision(&decided));
        assert!(store.moderation_history(decided.record.contribution_id).is_empty());
    }

    #[test]
    fn public_listing_excludes_pending_and_rejected() {
        let store = MemoryStore::new();
        let identity = individual("11144477735", "a@b.com");
        let identity_id = identity.id;
        store.insert_identity(identity).unwrap();

        let pending = contribution(identity_id, DocumentCode::Ceo);
        let approved = contribution(identity_id, DocumentCode::Ceo);
        let rejected = contribution(identity_id, DocumentCode::Ceo);
        let approved_id = approved.id;
        let rejected_id = rejected.id;
        store.insert_contribution(pending);
        store.insert_contribution(approved);
        store.insert_contribution(rejected);

        let reviewer = ReviewerId::new();
        let approve = ModerationState::Pending
            .apply(approved_id, reviewer, Decision::Approve)
            .unwrap();
        let reject = ModerationState::Pending
            .apply(
                rejected_id,
                reviewer,
                Decision::reject("out of scope for this consultation").unwrap(),
            )
            .unwrap();
        assert!(store.apply_decision(&approve));
        assert!(store.apply_decision(&reject));

        let page = store.list_public(&PublicFilter::default(), 50, 0);
        assert_eq!(page.total, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].contribution.id, approved_id);
        assert_eq!(page.items[0].contributor.display_name, "Ana Souza");
    }

    #[test]
    fn pending_queue_filters_and_paginates() {
        let store = MemoryStore::new();
        let identity = individual("11144477735", "a@b.com");
        let identity_id = identity.id;
        store.insert_identity(identity).unwrap();

        for _ in 0..3 {
            store.insert_contribution(contribution(identity_id, DocumentCode::Ceo));
        }
        store.insert_contribution(contribution(identity_id, DocumentCode::Cpeo));

        let all = store.pending_queue(&PendingFilter::default(), 50, 0);
        assert_eq!(all.total, 4);

        let ceo_only = store.pending_queue(
            &PendingFilter {
                document: Some(DocumentCode::Ceo),
                kind: None,
            },
            2,
            0,
        );
        assert_eq!(ceo_only.total, 3);
        assert_eq!(ceo_only.items.len(), 2);

        let second_page = store.pending_queue(
            &PendingFilter {
                document: Some(DocumentCode::Ceo),
                kind: None,
            },
            2,
            2,
        );
        assert_eq!(second_page.items.len(), 1);
    }

    #[test]
    fn listings_order_by_creation_time() {
        let store = MemoryStore::new();
        let identity = individual("11144477735", "a@b.com");
        let identity_id = identity.id;
        store.insert_identity(identity).unwrap();

        let base = Timestamp::now();
        let mut ids = Vec::new();
        for offset in 0..3 {
            let mut record = contribution(identity_id, DocumentCode::Ceo);
            record.created_at =
                Timestamp::from_utc(*base.as_datetime() + chrono::Duration::seconds(offset));
            ids.push(record.id);
            store.insert_contribution(record);
        }

        let owned = store.contributions_by_identity(identity_id, None);
        assert_eq!(
            owned.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![ids[2], ids[1], ids[0]],
            "owner listing is newest first"
        );

        let queue = store.pending_queue(&PendingFilter::default(), 50, 0);
        assert_eq!(
            queue.items.iter().map(|c| c.id).collect::<Vec<_>>(),
            ids,
            "pending queue is oldest first"
        );
    }

    #[test]
    fn duplicate_protocol_number_rejected() {
        let store = MemoryStore::new();
        store.insert_protocol(protocol(DocumentCode::Ceo, 2026, 1)).unwrap();
        let err = store
            .insert_protocol(protocol(DocumentCode::Ceo, 2026, 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateProtocolNumber));
        assert_eq!(store.count_protocols(), 1);
    }

    #[test]
    fn max_sequence_scoped_to_document_and_year() {
        let store = MemoryStore::new();
        assert_eq!(store.max_protocol_sequence(DocumentCode::Ceo, 2026), 0);
        store.insert_protocol(protocol(DocumentCode::Ceo, 2026, 1)).unwrap();
        store.insert_protocol(protocol(DocumentCode::Ceo, 2026, 2)).unwrap();
        store.insert_protocol(protocol(DocumentCode::Cpeo, 2026, 7)).unwrap();
        store.insert_protocol(protocol(DocumentCode::Ceo, 2025, 40)).unwrap();

        assert_eq!(store.max_protocol_sequence(DocumentCode::Ceo, 2026), 2);
        assert_eq!(store.max_protocol_sequence(DocumentCode::Cpeo, 2026), 7);
        assert_eq!(store.max_protocol_sequence(DocumentCode::Ceo, 2025), 40);
    }

    #[test]
    fn mark_notified_is_idempotent() {
        let store = MemoryStore::new();
        let record = protocol(DocumentCode::Ceo, 2026, 1);
        let id = record.id;
        store.insert_protocol(record).unwrap();

        let first = Timestamp::now();
        assert_eq!(store.mark_notified(id, first), Some(first));

        let later = Timestamp::from_utc(*first.as_datetime() + chrono::Duration::seconds(90));
        assert_eq!(store.mark_notified(id, later), Some(first));
        assert_eq!(store.protocol_by_id(id).unwrap().notified_at, Some(first));

        assert_eq!(store.mark_notified(ProtocolId::new(), first), None);
    }

    #[test]
    fn lookup_by_number_round_trips() {
        let store = MemoryStore::new();
        let record = protocol(DocumentCode::Cpeo, 2026, 123);
        let number = record.number;
        let id = record.id;
        store.insert_protocol(record).unwrap();

        let found = store.protocol_by_number(&number).unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.number.to_string(), "CP-CPEO-2026-000123");
    }
}
