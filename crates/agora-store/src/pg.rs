//! # PostgreSQL Store
//!
//! SQLx-backed persistence for consultation state. The schema lives in
//! `migrations/` and is applied by [`init_pool`] at startup.
//!
//! Two constraints carry load-bearing semantics:
//!
//! - the unique index on `identities (kind, national_id_digest)` makes
//!   registration idempotent under concurrency;
//! - the unique index on `protocols (number)` makes naive
//!   max-then-insert sequence assignment safe to retry.
//!
//! Moderation decisions are a status-guarded `UPDATE` plus an audit
//! record insert in one transaction: the loser of a reviewer race
//! affects zero rows and writes nothing.

use agora_core::{
    brasilia_offset, ContributionId, DocumentCode, IdentityId, ParticipantKind, ProtocolId,
    ProtocolNumber, RegionCode, ReviewerId, Timestamp,
};
use agora_crypto::{EncryptedField, FieldDigest, SealedValue};
use agora_state::{
    Decided, ModerationAction, ModerationRecord, ModerationState, ModerationStatus,
    RejectionReason,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::error::StoreError;
use crate::records::{
    ContributionRecord, ContributorRef, IdentityRecord, Page, PendingFilter, ProtocolRecord,
    PublicEntry, PublicFilter, StatusCounts,
};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    // Run embedded migrations.
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// PostgreSQL-backed consultation store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an initialized pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for health checks.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ─── Identities ──────────────────────────────────────────────────

    /// Insert a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateIdentityDigest`] when the unique
    /// index on `(kind, national_id_digest)` rejects the row.
    pub async fn insert_identity(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO identities (id, kind, national_id_digest, national_id_cipher,
             representative_digest, representative_cipher, email_digest, email_cipher,
             display_name, region, category, nature, consent_at, source_ip,
             user_agent, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(record.id.as_uuid())
        .bind(record.kind.as_str())
        .bind(record.national_id.digest().as_str())
        .bind(record.national_id.ciphertext().as_str())
        .bind(record.representative_id.as_ref().map(|s| s.digest().as_str()))
        .bind(
            record
                .representative_id
                .as_ref()
                .map(|s| s.ciphertext().as_str()),
        )
        .bind(record.email.digest().as_str())
        .bind(record.email.ciphertext().as_str())
        .bind(&record.display_name)
        .bind(record.region.as_str())
        .bind(record.category.map(|c| c.as_str()))
        .bind(record.nature.map(|n| n.as_str()))
        .bind(record.consent_at.as_datetime())
        .bind(&record.source_ip)
        .bind(record.user_agent.as_deref())
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|err| match unique_constraint(&err) {
            Some("identities_kind_digest_key") => StoreError::DuplicateIdentityDigest,
            _ => StoreError::from(err),
        })?;

        Ok(())
    }

    /// Fetch an identity by ID.
    pub async fn identity_by_id(
        &self,
        id: IdentityId,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            "SELECT id, kind, national_id_digest, national_id_cipher,
             representative_digest, representative_cipher, email_digest, email_cipher,
             display_name, region, category, nature, consent_at, source_ip,
             user_agent, created_at
             FROM identities WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(IdentityRow::into_record).transpose()
    }

    /// Fetch an identity by national ID digest and kind.
    pub async fn identity_by_digest(
        &self,
        kind: ParticipantKind,
        digest: &FieldDigest,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            "SELECT id, kind, national_id_digest, national_id_cipher,
             representative_digest, representative_cipher, email_digest, email_cipher,
             display_name, region, category, nature, consent_at, source_ip,
             user_agent, created_at
             FROM identities WHERE kind = $1 AND national_id_digest = $2",
        )
        .bind(kind.as_str())
        .bind(digest.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(IdentityRow::into_record).transpose()
    }

    /// Number of registered identities.
    pub async fn count_identities(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM identities")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    // ─── Contributions ───────────────────────────────────────────────

    /// Insert a new contribution.
    pub async fn insert_contribution(&self, record: &ContributionRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO contributions (id, identity_id, document, chapter_title,
             section, article, sub_item, kind, proposed_text, rationale,
             moderation_status, moderated_by, moderated_at, rejection_reason,
             source_ip, user_agent, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(record.id.as_uuid())
        .bind(record.identity_id.as_uuid())
        .bind(record.document.as_str())
        .bind(&record.chapter_title)
        .bind(record.section.as_deref())
        .bind(&record.article)
        .bind(record.sub_item.as_deref())
        .bind(record.kind.as_str())
        .bind(&record.proposed_text)
        .bind(&record.rationale)
        .bind(record.moderation.status().as_str())
        .bind(record.moderation.decided_by().map(|r| *r.as_uuid()))
        .bind(record.moderation.decided_at().map(|t| *t.as_datetime()))
        .bind(record.moderation.rejection_reason().map(|r| r.as_str().to_owned()))
        .bind(&record.source_ip)
        .bind(record.user_agent.as_deref())
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a contribution by ID.
    pub async fn contribution_by_id(
        &self,
        id: ContributionId,
    ) -> Result<Option<ContributionRecord>, StoreError> {
        let row = sqlx::query_as::<_, ContributionRow>(
            "SELECT id, identity_id, document, chapter_title, section, article,
             sub_item, kind, proposed_text, rationale, moderation_status,
             moderated_by, moderated_at, rejection_reason, source_ip,
             user_agent, created_at
             FROM contributions WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContributionRow::into_record).transpose()
    }

    /// Fetch contributions by ID, returned in the order given. Missing
    /// IDs are skipped with a warning; they indicate a broken reference.
    pub async fn contributions_by_ids(
        &self,
        ids: &[ContributionId],
    ) -> Result<Vec<ContributionRecord>, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, ContributionRow>(
            "SELECT id, identity_id, document, chapter_title, section, article,
             sub_item, kind, proposed_text, rationale, moderation_status,
             moderated_by, moderated_at, rejection_reason, source_ip,
             user_agent, created_at
             FROM contributions WHERE id = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id = std::collections::HashMap::with_capacity(rows.len());
        for row in rows {
            let record = row.into_record()?;
            by_id.insert(record.id, record);
        }

        Ok(ids
            .iter()
            .filter_map(|id| {
                let found = by_id.remove(id);
                if found.is_none() {
                    tracing::warn!(contribution_id = %id, "referenced contribution missing");
                }
                found
            })
            .collect())
    }

    /// All contributions by one identity, optionally narrowed to a
    /// document, newest first.
    pub async fn contributions_by_identity(
        &self,
        identity_id: IdentityId,
        document: Option<DocumentCode>,
    ) -> Result<Vec<ContributionRecord>, StoreError> {
        let rows = match document {
            Some(document) => {
                sqlx::query_as::<_, ContributionRow>(
                    "SELECT id, identity_id, document, chapter_title, section, article,
                     sub_item, kind, proposed_text, rationale, moderation_status,
                     moderated_by, moderated_at, rejection_reason, source_ip,
                     user_agent, created_at
                     FROM contributions WHERE identity_id = $1 AND document = $2
                     ORDER BY created_at DESC, id",
                )
                .bind(identity_id.as_uuid())
                .bind(document.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ContributionRow>(
                    "SELECT id, identity_id, document, chapter_title, section, article,
                     sub_item, kind, proposed_text, rationale, moderation_status,
                     moderated_by, moderated_at, rejection_reason, source_ip,
                     user_agent, created_at
                     FROM contributions WHERE identity_id = $1
                     ORDER BY created_at DESC, id",
                )
                .bind(identity_id.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(ContributionRow::into_record).collect()
    }

    /// IDs of all contributions by one identity for one document, in
    /// submission order. This is the list a protocol freezes.
    pub async fn contribution_ids_for(
        &self,
        identity_id: IdentityId,
        document: DocumentCode,
    ) -> Result<Vec<ContributionId>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM contributions WHERE identity_id = $1 AND document = $2
             ORDER BY created_at, id",
        )
        .bind(identity_id.as_uuid())
        .bind(document.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(ContributionId::from_uuid).collect())
    }

    /// One page of the public listing: APPROVED contributions only,
    /// newest first, joined with the contributor's display fields.
    pub async fn list_public(
        &self,
        filter: &PublicFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Page<PublicEntry>, StoreError> {
        let document = filter.document.map(|d| d.as_str());
        let article = filter.article.as_deref();

        let rows = sqlx::query_as::<_, PublicRow>(
            "SELECT c.id, c.identity_id, c.document, c.chapter_title, c.section,
             c.article, c.sub_item, c.kind, c.proposed_text, c.rationale,
             c.moderation_status, c.moderated_by, c.moderated_at,
             c.rejection_reason, c.source_ip, c.user_agent, c.created_at,
             i.display_name, i.region
             FROM contributions c
             JOIN identities i ON i.id = c.identity_id
             WHERE c.moderation_status = 'APPROVED'
               AND ($1::text IS NULL OR c.document = $1)
               AND ($2::text IS NULL OR c.article = $2)
             ORDER BY c.created_at DESC, c.id
             LIMIT $3 OFFSET $4",
        )
        .bind(document)
        .bind(article)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contributions c
             WHERE c.moderation_status = 'APPROVED'
               AND ($1::text IS NULL OR c.document = $1)
               AND ($2::text IS NULL OR c.article = $2)",
        )
        .bind(document)
        .bind(article)
        .fetch_one(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(PublicRow::into_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    /// One page of the reviewer queue: PENDING contributions, oldest
    /// first.
    pub async fn pending_queue(
        &self,
        filter: &PendingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Page<ContributionRecord>, StoreError> {
        let document = filter.document.map(|d| d.as_str());
        let kind = filter.kind.map(|k| k.as_str());

        let rows = sqlx::query_as::<_, ContributionRow>(
            "SELECT id, identity_id, document, chapter_title, section, article,
             sub_item, kind, proposed_text, rationale, moderation_status,
             moderated_by, moderated_at, rejection_reason, source_ip,
             user_agent, created_at
             FROM contributions
             WHERE moderation_status = 'PENDING'
               AND ($1::text IS NULL OR document = $1)
               AND ($2::text IS NULL OR kind = $2)
             ORDER BY created_at, id
             LIMIT $3 OFFSET $4",
        )
        .bind(document)
        .bind(kind)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contributions
             WHERE moderation_status = 'PENDING'
               AND ($1::text IS NULL OR document = $1)
               AND ($2::text IS NULL OR kind = $2)",
        )
        .bind(document)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(ContributionRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    /// Contribution counts by moderation status. Rows with an unknown
    /// status are logged and skipped rather than failing the scrape.
    pub async fn contribution_status_counts(&self) -> Result<StatusCounts, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT moderation_status, COUNT(*) FROM contributions GROUP BY moderation_status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let count = u64::try_from(count).unwrap_or(0);
            match status.parse::<ModerationStatus>() {
                Ok(ModerationStatus::Pending) => counts.pending += count,
                Ok(ModerationStatus::Approved) => counts.approved += count,
                Ok(ModerationStatus::Rejected) => counts.rejected += count,
                Err(_) => {
                    tracing::warn!(status, "unknown moderation status in contributions table");
                }
            }
        }
        Ok(counts)
    }

    // ─── Moderation ──────────────────────────────────────────────────

    /// Apply a moderation decision: a status-guarded update plus the
    /// audit record insert, in one transaction.
    ///
    /// Returns `false` without writing anything when the contribution is
    /// missing or no longer PENDING — the caller lost a reviewer race.
    pub async fn apply_decision(&self, decided: &Decided) -> Result<bool, StoreError> {
        let record = &decided.record;
        let state = &decided.state;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE contributions
             SET moderation_status = $2, moderated_by = $3, moderated_at = $4,
                 rejection_reason = $5
             WHERE id = $1 AND moderation_status = 'PENDING'",
        )
        .bind(record.contribution_id.as_uuid())
        .bind(state.status().as_str())
        .bind(state.decided_by().map(|r| *r.as_uuid()))
        .bind(state.decided_at().map(|t| *t.as_datetime()))
        .bind(state.rejection_reason().map(|r| r.as_str().to_owned()))
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO moderation_records (contribution_id, reviewer_id, action,
             reason, recorded_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.contribution_id.as_uuid())
        .bind(record.reviewer_id.as_uuid())
        .bind(record.action.as_str())
        .bind(record.reason.as_ref().map(|r| r.as_str().to_owned()))
        .bind(record.recorded_at.as_datetime())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Chronological moderation history of one contribution.
    pub async fn moderation_history(
        &self,
        id: ContributionId,
    ) -> Result<Vec<ModerationRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ModerationRecordRow>(
            "SELECT contribution_id, reviewer_id, action, reason, recorded_at
             FROM moderation_records WHERE contribution_id = $1
             ORDER BY recorded_at, id",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ModerationRecordRow::into_record).collect()
    }

    // ─── Protocols ───────────────────────────────────────────────────

    /// Highest issued sequence for `(document, year)`, or 0 when none.
    pub async fn max_protocol_sequence(
        &self,
        document: DocumentCode,
        year: i32,
    ) -> Result<u32, StoreError> {
        let max: Option<i32> =
            sqlx::query_scalar("SELECT MAX(sequence) FROM protocols WHERE document = $1 AND year = $2")
                .bind(document.as_str())
                .bind(year)
                .fetch_one(&self.pool)
                .await?;

        Ok(max.map_or(0, |seq| u32::try_from(seq).unwrap_or(0)))
    }

    /// Insert a new protocol.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateProtocolNumber`] when the unique
    /// index on the number column rejects the row.
    pub async fn insert_protocol(&self, record: &ProtocolRecord) -> Result<(), StoreError> {
        let contribution_ids: Vec<Uuid> = record
            .contribution_ids
            .iter()
            .map(|id| *id.as_uuid())
            .collect();

        sqlx::query(
            "INSERT INTO protocols (id, number, document, year, sequence, identity_id,
             contribution_ids, total_contributions, created_at_local, created_at_utc,
             notified_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(record.id.as_uuid())
        .bind(record.number.to_string())
        .bind(record.number.document().as_str())
        .bind(record.number.year())
        .bind(i32::try_from(record.number.sequence()).unwrap_or(i32::MAX))
        .bind(record.identity_id.as_uuid())
        .bind(&contribution_ids)
        .bind(i32::try_from(record.total_contributions).unwrap_or(i32::MAX))
        .bind(record.created_at_local.with_timezone(&Utc))
        .bind(record.created_at_utc.as_datetime())
        .bind(record.notified_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|err| match unique_constraint(&err) {
            Some("protocols_number_key") => StoreError::DuplicateProtocolNumber,
            _ => StoreError::from(err),
        })?;

        Ok(())
    }

    /// Fetch a protocol by ID.
    pub async fn protocol_by_id(&self, id: ProtocolId) -> Result<Option<ProtocolRecord>, StoreError> {
        let row = sqlx::query_as::<_, ProtocolRow>(
            "SELECT id, number, identity_id, contribution_ids, total_contributions,
             created_at_local, created_at_utc, notified_at
             FROM protocols WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProtocolRow::into_record).transpose()
    }

    /// Fetch a protocol by its public number.
    pub async fn protocol_by_number(
        &self,
        number: &ProtocolNumber,
    ) -> Result<Option<ProtocolRecord>, StoreError> {
        let row = sqlx::query_as::<_, ProtocolRow>(
            "SELECT id, number, identity_id, contribution_ids, total_contributions,
             created_at_local, created_at_utc, notified_at
             FROM protocols WHERE number = $1",
        )
        .bind(number.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProtocolRow::into_record).transpose()
    }

    /// Set `notified_at` if unset, returning the effective value.
    ///
    /// Idempotent: a protocol already marked keeps its original
    /// timestamp. `None` means the protocol does not exist.
    pub async fn mark_notified(
        &self,
        id: ProtocolId,
        at: Timestamp,
    ) -> Result<Option<Timestamp>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT notified_at FROM protocols WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;

        let Some(existing) = existing else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(already) = existing {
            tx.rollback().await?;
            return Ok(Some(Timestamp::from_utc(already)));
        }

        sqlx::query("UPDATE protocols SET notified_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at.as_datetime())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(at))
    }

    /// Number of issued protocols.
    pub async fn count_protocols(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM protocols")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// The violated unique constraint's name, if `err` is a unique violation.
fn unique_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => db.constraint(),
        _ => None,
    }
}

fn corrupt<E: std::fmt::Display>(entity: &'static str) -> impl FnOnce(E) -> StoreError {
    move |err| StoreError::corrupt(entity, err.to_string())
}

// ─── Row types ───────────────────────────────────────────────────────

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    kind: String,
    national_id_digest: String,
    national_id_cipher: String,
    representative_digest: Option<String>,
    representative_cipher: Option<String>,
    email_digest: String,
    email_cipher: String,
    display_name: String,
    region: String,
    category: Option<String>,
    nature: Option<String>,
    consent_at: DateTime<Utc>,
    source_ip: String,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_record(self) -> Result<IdentityRecord, StoreError> {
        let representative_id = match (self.representative_digest, self.representative_cipher) {
            (Some(digest), Some(cipher)) => Some(sealed(digest, cipher)?),
            (None, None) => None,
            _ => {
                return Err(StoreError::corrupt(
                    "identity",
                    "representative digest and ciphertext must be present together",
                ))
            }
        };

        Ok(IdentityRecord {
            id: IdentityId::from_uuid(self.id),
            kind: self.kind.parse().map_err(corrupt("identity"))?,
            national_id: sealed(self.national_id_digest, self.national_id_cipher)?,
            representative_id,
            email: sealed(self.email_digest, self.email_cipher)?,
            display_name: self.display_name,
            region: RegionCode::new(self.region).map_err(corrupt("identity"))?,
            category: self
                .category
                .map(|c| c.parse().map_err(corrupt("identity")))
                .transpose()?,
            nature: self
                .nature
                .map(|n| n.parse().map_err(corrupt("identity")))
                .transpose()?,
            consent_at: Timestamp::from_utc(self.consent_at),
            source_ip: self.source_ip,
            user_agent: self.user_agent,
            created_at: Timestamp::from_utc(self.created_at),
        })
    }
}

fn sealed(digest: String, cipher: String) -> Result<SealedValue, StoreError> {
    Ok(SealedValue::from_stored(
        FieldDigest::from_hex(digest).map_err(corrupt("identity"))?,
        EncryptedField::from_stored(cipher),
    ))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ContributionRow {
    id: Uuid,
    identity_id: Uuid,
    document: String,
    chapter_title: String,
    section: Option<String>,
    article: String,
    sub_item: Option<String>,
    kind: String,
    proposed_text: String,
    rationale: String,
    moderation_status: String,
    moderated_by: Option<Uuid>,
    moderated_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    source_ip: String,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl ContributionRow {
    fn into_record(self) -> Result<ContributionRecord, StoreError> {
        let status: ModerationStatus = self
            .moderation_status
            .parse()
            .map_err(corrupt("contribution"))?;
        let moderation = match status {
            ModerationStatus::Pending => ModerationState::Pending,
            ModerationStatus::Approved => {
                let (by, at) = decided_columns(self.moderated_by, self.moderated_at)?;
                ModerationState::Approved { by, at }
            }
            ModerationStatus::Rejected => {
                let (by, at) = decided_columns(self.moderated_by, self.moderated_at)?;
                let reason = self.rejection_reason.ok_or_else(|| {
                    StoreError::corrupt("contribution", "REJECTED row without rejection_reason")
                })?;
                ModerationState::Rejected {
                    by,
                    at,
                    reason: RejectionReason::new(reason).map_err(corrupt("contribution"))?,
                }
            }
        };

        Ok(ContributionRecord {
            id: ContributionId::from_uuid(self.id),
            identity_id: IdentityId::from_uuid(self.identity_id),
            document: self.document.parse().map_err(corrupt("contribution"))?,
            chapter_title: self.chapter_title,
            section: self.section,
            article: self.article,
            sub_item: self.sub_item,
            kind: self.kind.parse().map_err(corrupt("contribution"))?,
            proposed_text: self.proposed_text,
            rationale: self.rationale,
            moderation,
            source_ip: self.source_ip,
            user_agent: self.user_agent,
            created_at: Timestamp::from_utc(self.created_at),
        })
    }
}

fn decided_columns(
    by: Option<Uuid>,
    at: Option<DateTime<Utc>>,
) -> Result<(ReviewerId, Timestamp), StoreError> {
    match (by, at) {
        (Some(by), Some(at)) => Ok((ReviewerId::from_uuid(by), Timestamp::from_utc(at))),
        _ => Err(StoreError::corrupt(
            "contribution",
            "decided row without reviewer and timestamp",
        )),
    }
}

/// Internal row type for SQLx mapping: a contribution joined with its
/// contributor's display fields.
#[derive(sqlx::FromRow)]
struct PublicRow {
    #[sqlx(flatten)]
    contribution: ContributionRow,
    display_name: String,
    region: String,
}

impl PublicRow {
    fn into_entry(self) -> Result<PublicEntry, StoreError> {
        Ok(PublicEntry {
            contribution: self.contribution.into_record()?,
            contributor: ContributorRef {
                display_name: self.display_name,
                region: RegionCode::new(self.region).map_err(corrupt("identity"))?,
            },
        })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ModerationRecordRow {
    contribution_id: Uuid,
    reviewer_id: Uuid,
    action: String,
    reason: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl ModerationRecordRow {
    fn into_record(self) -> Result<ModerationRecord, StoreError> {
        let action: ModerationAction = self.action.parse().map_err(corrupt("moderation record"))?;
        Ok(ModerationRecord {
            contribution_id: ContributionId::from_uuid(self.contribution_id),
            reviewer_id: ReviewerId::from_uuid(self.reviewer_id),
            action,
            reason: self
                .reason
                .map(|r| RejectionReason::new(r).map_err(corrupt("moderation record")))
                .transpose()?,
            recorded_at: Timestamp::from_utc(self.recorded_at),
        })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ProtocolRow {
    id: Uuid,
    number: String,
    identity_id: Uuid,
    contribution_ids: Vec<Uuid>,
    total_contributions: i32,
    created_at_local: DateTime<Utc>,
    created_at_utc: DateTime<Utc>,
    notified_at: Option<DateTime<Utc>>,
}

impl ProtocolRow {
    fn into_record(self) -> Result<ProtocolRecord, StoreError> {
        let number: ProtocolNumber = self.number.parse().map_err(corrupt("protocol"))?;
        Ok(ProtocolRecord {
            id: ProtocolId::from_uuid(self.id),
            number,
            identity_id: IdentityId::from_uuid(self.identity_id),
            document: number.document(),
            contribution_ids: self
                .contribution_ids
                .into_iter()
                .map(ContributionId::from_uuid)
                .collect(),
            total_contributions: u32::try_from(self.total_contributions).unwrap_or_else(|_| {
                tracing::warn!(
                    total = self.total_contributions,
                    "negative contribution total in protocols table — defaulting to 0"
                );
                0
            }),
            created_at_local: self.created_at_local.with_timezone(&brasilia_offset()),
            created_at_utc: Timestamp::from_utc(self.created_at_utc),
            notified_at: self.notified_at.map(Timestamp::from_utc),
        })
    }
}
