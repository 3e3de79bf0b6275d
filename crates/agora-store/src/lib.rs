//! # agora-store — Consultation Persistence
//!
//! Record shapes and storage backends for the intake stack. One store
//! interface, two backends:
//!
//! - [`MemoryStore`] — `parking_lot::RwLock` tables. Used by tests and
//!   by deployments without a `DATABASE_URL`.
//! - [`PgStore`] — SQLx/PostgreSQL with embedded migrations.
//!
//! [`ConsultationStore`] is the switch between them. Both backends
//! uphold the same contracts, so the services above never branch on the
//! backend:
//!
//! - one identity per `(kind, national ID digest)`; a duplicate insert
//!   fails with [`StoreError::DuplicateIdentityDigest`] and the caller
//!   falls back to lookup;
//! - one protocol per number; a duplicate insert fails with
//!   [`StoreError::DuplicateProtocolNumber`] and the issuer retries with
//!   a re-read sequence;
//! - a moderation decision writes the status transition and its audit
//!   record atomically, and a contribution that is no longer PENDING is
//!   left untouched.

pub mod error;
pub mod memory;
pub mod pg;
pub mod records;

use agora_core::{
    ContributionId, DocumentCode, IdentityId, ParticipantKind, ProtocolId, ProtocolNumber,
    Timestamp,
};
use agora_crypto::FieldDigest;
use agora_state::{Decided, ModerationRecord};
use sqlx::PgPool;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use pg::{init_pool, PgStore};
pub use records::{
    ContributionRecord, ContributorRef, IdentityRecord, Page, PendingFilter, ProtocolRecord,
    PublicEntry, PublicFilter, StatusCounts,
};

/// The consultation store: every read and write the services need,
/// dispatched to the configured backend.
#[derive(Clone)]
pub enum ConsultationStore {
    /// Process-local tables; nothing survives a restart.
    Memory(MemoryStore),
    /// SQLx/PostgreSQL.
    Postgres(PgStore),
}

impl ConsultationStore {
    /// An empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// A store over an initialized PostgreSQL pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self::Postgres(PgStore::new(pool))
    }

    /// The underlying pool, when running on PostgreSQL. Health probes
    /// use this to check connectivity.
    pub fn pool(&self) -> Option<&PgPool> {
        match self {
            Self::Memory(_) => None,
            Self::Postgres(pg) => Some(pg.pool()),
        }
    }

    // ─── Identities ──────────────────────────────────────────────────

    /// Insert a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateIdentityDigest`] when an identity
    /// with the same kind and national ID digest already exists.
    pub async fn insert_identity(&self, record: IdentityRecord) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.insert_identity(record),
            Self::Postgres(store) => store.insert_identity(&record).await,
        }
    }

    /// Fetch an identity by ID.
    pub async fn identity_by_id(
        &self,
        id: IdentityId,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.identity_by_id(id)),
            Self::Postgres(store) => store.identity_by_id(id).await,
        }
    }

    /// Fetch an identity by national ID digest and kind.
    pub async fn identity_by_digest(
        &self,
        kind: ParticipantKind,
        digest: &FieldDigest,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.identity_by_digest(kind, digest)),
            Self::Postgres(store) => store.identity_by_digest(kind, digest).await,
        }
    }

    /// Number of registered identities.
    pub async fn count_identities(&self) -> Result<u64, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.count_identities()),
            Self::Postgres(store) => store.count_identities().await,
        }
    }

    // ─── Contributions ───────────────────────────────────────────────

    /// Insert a new contribution.
    pub async fn insert_contribution(&self, record: ContributionRecord) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => {
                store.insert_contribution(record);
                Ok(())
            }
            Self::Postgres(store) => store.insert_contribution(&record).await,
        }
    }

    /// Fetch a contribution by ID.
    pub async fn contribution_by_id(
        &self,
        id: ContributionId,
    ) -> Result<Option<ContributionRecord>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.contribution_by_id(id)),
            Self::Postgres(store) => store.contribution_by_id(id).await,
        }
    }

    /// Fetch contributions by ID, returned in the order given.
    pub async fn contributions_by_ids(
        &self,
        ids: &[ContributionId],
    ) -> Result<Vec<ContributionRecord>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.contributions_by_ids(ids)),
            Self::Postgres(store) => store.contributions_by_ids(ids).await,
        }
    }

    /// All contributions by one identity, optionally narrowed to a
    /// document, newest first.
    pub async fn contributions_by_identity(
        &self,
        identity_id: IdentityId,
        document: Option<DocumentCode>,
    ) -> Result<Vec<ContributionRecord>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.contributions_by_identity(identity_id, document)),
            Self::Postgres(store) => store.contributions_by_identity(identity_id, document).await,
        }
    }

    /// IDs of all contributions by one identity for one document, in
    /// submission order.
    pub async fn contribution_ids_for(
        &self,
        identity_id: IdentityId,
        document: DocumentCode,
    ) -> Result<Vec<ContributionId>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.contribution_ids_for(identity_id, document)),
            Self::Postgres(store) => store.contribution_ids_for(identity_id, document).await,
        }
    }

    /// One page of the public listing: APPROVED contributions only,
    /// newest first, joined with contributor display fields.
    pub async fn list_public(
        &self,
        filter: &PublicFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Page<PublicEntry>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.list_public(filter, limit, offset)),
            Self::Postgres(store) => store.list_public(filter, limit, offset).await,
        }
    }

    /// One page of the reviewer queue: PENDING contributions, oldest
    /// first.
    pub async fn pending_queue(
        &self,
        filter: &PendingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Page<ContributionRecord>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.pending_queue(filter, limit, offset)),
            Self::Postgres(store) => store.pending_queue(filter, limit, offset).await,
        }
    }

    /// Contribution counts by moderation status.
    pub async fn contribution_status_counts(&self) -> Result<StatusCounts, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.contribution_status_counts()),
            Self::Postgres(store) => store.contribution_status_counts().await,
        }
    }

    // ─── Moderation ──────────────────────────────────────────────────

    /// Apply a moderation decision atomically.
    ///
    /// Returns `false` without writing anything when the contribution is
    /// missing or no longer PENDING.
    pub async fn apply_decision(&self, decided: &Decided) -> Result<bool, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.apply_decision(decided)),
            Self::Postgres(store) => store.apply_decision(decided).await,
        }
    }

    /// Chronological moderation history of one contribution.
    pub async fn moderation_history(
        &self,
        id: ContributionId,
    ) -> Result<Vec<ModerationRecord>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.moderation_history(id)),
            Self::Postgres(store) => store.moderation_history(id).await,
        }
    }

    // ─── Protocols ───────────────────────────────────────────────────

    /// Highest issued sequence for `(document, year)`, or 0 when none.
    pub async fn max_protocol_sequence(
        &self,
        document: DocumentCode,
        year: i32,
    ) -> Result<u32, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.max_protocol_sequence(document, year)),
            Self::Postgres(store) => store.max_protocol_sequence(document, year).await,
        }
    }

    /// Insert a new protocol.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateProtocolNumber`] when the number is
    /// already issued.
    pub async fn insert_protocol(&self, record: ProtocolRecord) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.insert_protocol(record),
            Self::Postgres(store) => store.insert_protocol(&record).await,
        }
    }

    /// Fetch a protocol by ID.
    pub async fn protocol_by_id(&self, id: ProtocolId) -> Result<Option<ProtocolRecord>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.protocol_by_id(id)),
            Self::Postgres(store) => store.protocol_by_id(id).await,
        }
    }

    /// Fetch a protocol by its public number.
    pub async fn protocol_by_number(
        &self,
        number: &ProtocolNumber,
    ) -> Result<Option<ProtocolRecord>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.protocol_by_number(number)),
            Self::Postgres(store) => store.protocol_by_number(number).await,
        }
    }

    /// Set `notified_at` if unset, returning the effective value.
    /// `None` means the protocol does not exist.
    pub async fn mark_notified(
        &self,
        id: ProtocolId,
        at: Timestamp,
    ) -> Result<Option<Timestamp>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.mark_notified(id, at)),
            Self::Postgres(store) => store.mark_notified(id, at).await,
        }
    }

    /// Number of issued protocols.
    pub async fn count_protocols(&self) -> Result<u64, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.count_protocols()),
            Self::Postgres(store) => store.count_protocols().await,
        }
    }
}
