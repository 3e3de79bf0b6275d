//! # Moderation Engine
//!
//! Applies reviewer decisions to pending contributions. The pure state
//! machine lives in `agora_state`; this module wires it to the store and
//! defines the concurrency contract: a contribution transitions exactly
//! once, losers of a review race observe a benign skip, and the status
//! write and its audit record land together or not at all.

use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use agora_core::{ContributionId, ReviewerId, ValidationError};
use agora_state::{Decision, ModerationError, ModerationRecord};
use agora_store::{ConsultationStore, ContributionRecord, PendingFilter};

use crate::error::ServiceError;
use crate::paging::{PageRequest, Paged};

/// Batch decision size bounds.
const BATCH_MIN: usize = 1;
const BATCH_MAX: usize = 100;

/// The outcome of a single moderation call.
#[derive(Debug, Clone)]
pub enum Moderated {
    /// The transition was applied; the contribution in its new state.
    Decided(ContributionRecord),
    /// The contribution was missing or already decided. A benign no-op:
    /// two reviewers racing over one item is expected operation, not an
    /// error.
    Skipped,
}

impl Moderated {
    /// Whether this call performed the transition.
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Decided(_))
    }

    /// The updated contribution, when decided.
    pub fn decided(&self) -> Option<&ContributionRecord> {
        match self {
            Self::Decided(record) => Some(record),
            Self::Skipped => None,
        }
    }
}

/// Counts reported by a batch decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Contributions this batch transitioned.
    pub decided: usize,
    /// Contributions skipped: already decided or not found.
    pub skipped: usize,
}

/// Reviewer decisions over pending contributions.
#[derive(Clone)]
pub struct ModerationEngine {
    store: ConsultationStore,
}

impl ModerationEngine {
    /// Build an engine over a store.
    pub fn new(store: ConsultationStore) -> Self {
        Self { store }
    }

    /// Approve a pending contribution.
    pub async fn approve(
        &self,
        contribution_id: ContributionId,
        reviewer_id: ReviewerId,
    ) -> Result<Moderated, ServiceError> {
        self.decide(contribution_id, reviewer_id, Decision::Approve)
            .await
    }

    /// Reject a pending contribution with a mandatory reason.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] when the reason violates its
    /// `10..=1000` character bounds.
    pub async fn reject(
        &self,
        contribution_id: ContributionId,
        reviewer_id: ReviewerId,
        reason: &str,
    ) -> Result<Moderated, ServiceError> {
        let decision = Decision::reject(reason)?;
        self.decide(contribution_id, reviewer_id, decision).await
    }

    /// Approve a batch of contributions, each independently.
    pub async fn approve_batch(
        &self,
        ids: &[ContributionId],
        reviewer_id: ReviewerId,
    ) -> Result<BatchOutcome, ServiceError> {
        self.decide_batch(ids, reviewer_id, Decision::Approve).await
    }

    /// Reject a batch of contributions with one shared reason.
    pub async fn reject_batch(
        &self,
        ids: &[ContributionId],
        reviewer_id: ReviewerId,
        reason: &str,
    ) -> Result<BatchOutcome, ServiceError> {
        let decision = Decision::reject(reason)?;
        self.decide_batch(ids, reviewer_id, decision).await
    }

    /// Chronological moderation history of one contribution.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] when the contribution does not exist;
    /// an existing but undecided contribution has an empty history.
    pub async fn history(
        &self,
        contribution_id: ContributionId,
    ) -> Result<Vec<ModerationRecord>, ServiceError> {
        if self
            .store
            .contribution_by_id(contribution_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound("contribution"));
        }
        Ok(self.store.moderation_history(contribution_id).await?)
    }

    /// The reviewer work queue: PENDING contributions, oldest first.
    pub async fn pending(
        &self,
        filter: PendingFilter,
        page: PageRequest,
    ) -> Result<Paged<ContributionRecord>, ServiceError> {
        let listed = self
            .store
            .pending_queue(&filter, page.limit(), page.offset())
            .await?;
        Ok(Paged::from_page(listed, page))
    }

    /// Apply one decision, treating races and missing rows as skips.
    async fn decide(
        &self,
        contribution_id: ContributionId,
        reviewer_id: ReviewerId,
        decision: Decision,
    ) -> Result<Moderated, ServiceError> {
        let Some(current) = self.store.contribution_by_id(contribution_id).await? else {
            return Ok(Moderated::Skipped);
        };

        let decided = match current.moderation.apply(contribution_id, reviewer_id, decision) {
            Ok(decided) => decided,
            Err(ModerationError::AlreadyDecided { current }) => {
                info!(%contribution_id, status = %current, "moderation skipped, already decided");
                return Ok(Moderated::Skipped);
            }
        };

        // The store revalidates the PENDING guard under its own lock; a
        // `false` here means another reviewer won between our read and
        // this write.
        if !self.store.apply_decision(&decided).await? {
            info!(%contribution_id, "moderation skipped, lost decision race");
            return Ok(Moderated::Skipped);
        }

        let mut updated = current;
        updated.moderation = decided.state;
        Ok(Moderated::Decided(updated))
    }

    /// Apply one decision across a deduplicated batch.
    async fn decide_batch(
        &self,
        ids: &[ContributionId],
        reviewer_id: ReviewerId,
        decision: Decision,
    ) -> Result<BatchOutcome, ServiceError> {
        if !(BATCH_MIN..=BATCH_MAX).contains(&ids.len()) {
            return Err(ValidationError::BatchSize {
                len: ids.len(),
                min: BATCH_MIN,
                max: BATCH_MAX,
            }
            .into());
        }

        let mut seen = HashSet::with_capacity(ids.len());
        let mut outcome = BatchOutcome::default();
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            // Store failures abort the batch; skips never do.
            match self.decide(id, reviewer_id, decision.clone()).await? {
                Moderated::Decided(_) => outcome.decided += 1,
                Moderated::Skipped => outcome.skipped += 1,
            }
        }
        info!(
            decided = outcome.decided,
            skipped = outcome.skipped,
            action = %decision.action(),
            "moderation batch applied"
        );
        Ok(outcome)
    }
}
