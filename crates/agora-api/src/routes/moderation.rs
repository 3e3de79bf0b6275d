//! # Moderation API
//!
//! The reviewer surface: single and batch decisions, the pending work
//! queue, and the append-only audit history. Every route here is
//! mounted behind reviewer authentication; the capability check per
//! operation happens in the handler.
//!
//! A decision against an already-decided contribution is not an error:
//! the response reports `decided: false` and the stored state is
//! untouched. Batches behave the same way per item.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use agora_core::{ContributionId, ContributionKind, PrivilegedOp};
use agora_service::{BatchOutcome, Moderated, PageRequest, Paged};
use agora_store::{ContributionRecord, PendingFilter};
use agora_state::ModerationRecord;

use crate::auth::ReviewerContext;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::contributions::{parse_document, ContributionResponse};
use crate::state::AppState;

/// Request to reject a contribution.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectRequest {
    /// Reviewer-facing reason, 10..=1000 characters. Recorded in the
    /// audit history and shown to the contributor.
    pub reason: String,
}

impl Validate for RejectRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must be non-empty".to_string());
        }
        Ok(())
    }
}

/// Request to approve a batch of contributions.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveBatchRequest {
    /// 1..=100 contribution IDs; duplicates are deduplicated.
    pub contribution_ids: Vec<Uuid>,
}

impl Validate for ApproveBatchRequest {
    fn validate(&self) -> Result<(), String> {
        if self.contribution_ids.is_empty() {
            return Err("contribution_ids must be non-empty".to_string());
        }
        Ok(())
    }
}

/// Request to reject a batch of contributions with one shared reason.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectBatchRequest {
    /// 1..=100 contribution IDs; duplicates are deduplicated.
    pub contribution_ids: Vec<Uuid>,
    /// Shared rejection reason, 10..=1000 characters.
    pub reason: String,
}

impl Validate for RejectBatchRequest {
    fn validate(&self) -> Result<(), String> {
        if self.contribution_ids.is_empty() {
            return Err("contribution_ids must be non-empty".to_string());
        }
        if self.reason.trim().is_empty() {
            return Err("reason must be non-empty".to_string());
        }
        Ok(())
    }
}

/// The outcome of a single decision.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecisionResponse {
    /// Whether this call performed the transition. `false` means the
    /// contribution was already decided (or vanished in a race) and
    /// nothing changed.
    pub decided: bool,
    /// The contribution after this call, when it performed the
    /// transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contribution: Option<ContributionResponse>,
}

impl From<Moderated> for DecisionResponse {
    fn from(outcome: Moderated) -> Self {
        Self {
            decided: outcome.is_decided(),
            contribution: outcome.decided().map(ContributionResponse::from),
        }
    }
}

/// Aggregate counts for a batch decision.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchOutcomeResponse {
    /// Contributions this batch transitioned.
    pub decided: usize,
    /// Contributions skipped: already decided or not found.
    pub skipped: usize,
}

impl From<BatchOutcome> for BatchOutcomeResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            decided: outcome.decided,
            skipped: outcome.skipped,
        }
    }
}

/// One audit history entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModerationRecordResponse {
    pub contribution_id: Uuid,
    pub reviewer_id: Uuid,
    /// APPROVE or REJECT.
    pub action: String,
    /// Present iff the action is REJECT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// RFC 3339 UTC.
    pub recorded_at: String,
}

impl From<&ModerationRecord> for ModerationRecordResponse {
    fn from(record: &ModerationRecord) -> Self {
        Self {
            contribution_id: *record.contribution_id.as_uuid(),
            reviewer_id: *record.reviewer_id.as_uuid(),
            action: record.action.as_str().to_string(),
            reason: record.reason.as_ref().map(|r| r.as_str().to_string()),
            recorded_at: record.recorded_at.to_rfc3339_z(),
        }
    }
}

/// Pending queue filters and pagination.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct PendingParams {
    /// Restrict to one document (CEO or CPEO).
    pub document: Option<String>,
    /// Restrict to one contribution kind.
    pub kind: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, clamped to 100.
    pub per_page: Option<u32>,
}

/// One page of the pending queue, oldest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingListResponse {
    pub items: Vec<ContributionResponse>,
    pub page: u32,
    pub per_page: u32,
    /// Total pending items across all pages.
    pub total: u64,
    pub total_pages: u64,
}

impl From<Paged<ContributionRecord>> for PendingListResponse {
    fn from(paged: Paged<ContributionRecord>) -> Self {
        let paged = paged.map(|record| ContributionResponse::from(&record));
        Self {
            items: paged.items,
            page: paged.page,
            per_page: paged.per_page,
            total: paged.total,
            total_pages: paged.total_pages,
        }
    }
}

/// Moderation routes; all mounted behind reviewer authentication.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/moderation/{id}/approve", post(approve_contribution))
        .route("/v1/moderation/{id}/reject", post(reject_contribution))
        .route("/v1/moderation/approve-batch", post(approve_batch))
        .route("/v1/moderation/reject-batch", post(reject_batch))
        .route("/v1/moderation/{id}/history", get(moderation_history))
        .route("/v1/moderation/pending", get(pending_queue))
}

/// POST /v1/moderation/{id}/approve — Approve a pending contribution.
#[utoipa::path(
    post,
    path = "/v1/moderation/{id}/approve",
    params(("id" = Uuid, Path, description = "Contribution ID")),
    responses(
        (status = 200, description = "Decision outcome", body = DecisionResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Role may not moderate", body = crate::error::ErrorBody),
        (status = 404, description = "Contribution not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "moderation"
)]
pub(crate) async fn approve_contribution(
    State(state): State<AppState>,
    Extension(ctx): Extension<ReviewerContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<DecisionResponse>, AppError> {
    ctx.require(PrivilegedOp::ModerateContributions)?;
    let outcome = state
        .moderation
        .approve(ContributionId::from_uuid(id), ctx.reviewer_id)
        .await?;
    Ok(Json(DecisionResponse::from(outcome)))
}

/// POST /v1/moderation/{id}/reject — Reject a pending contribution.
#[utoipa::path(
    post,
    path = "/v1/moderation/{id}/reject",
    params(("id" = Uuid, Path, description = "Contribution ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Decision outcome", body = DecisionResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Role may not moderate", body = crate::error::ErrorBody),
        (status = 404, description = "Contribution not found", body = crate::error::ErrorBody),
        (status = 422, description = "Reason out of bounds", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "moderation"
)]
pub(crate) async fn reject_contribution(
    State(state): State<AppState>,
    Extension(ctx): Extension<ReviewerContext>,
    Path(id): Path<Uuid>,
    body: Result<Json<RejectRequest>, JsonRejection>,
) -> Result<Json<DecisionResponse>, AppError> {
    ctx.require(PrivilegedOp::ModerateContributions)?;
    let req = extract_validated_json(body)?;
    let outcome = state
        .moderation
        .reject(ContributionId::from_uuid(id), ctx.reviewer_id, &req.reason)
        .await?;
    Ok(Json(DecisionResponse::from(outcome)))
}

/// POST /v1/moderation/approve-batch — Approve up to 100 contributions.
#[utoipa::path(
    post,
    path = "/v1/moderation/approve-batch",
    request_body = ApproveBatchRequest,
    responses(
        (status = 200, description = "Batch counts", body = BatchOutcomeResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Role may not moderate", body = crate::error::ErrorBody),
        (status = 422, description = "Batch size out of bounds", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "moderation"
)]
pub(crate) async fn approve_batch(
    State(state): State<AppState>,
    Extension(ctx): Extension<ReviewerContext>,
    body: Result<Json<ApproveBatchRequest>, JsonRejection>,
) -> Result<Json<BatchOutcomeResponse>, AppError> {
    ctx.require(PrivilegedOp::ModerateContributions)?;
    let req = extract_validated_json(body)?;
    let ids = to_contribution_ids(&req.contribution_ids);
    let outcome = state.moderation.approve_batch(&ids, ctx.reviewer_id).await?;
    Ok(Json(BatchOutcomeResponse::from(outcome)))
}

/// POST /v1/moderation/reject-batch — Reject up to 100 contributions
/// with one shared reason.
#[utoipa::path(
    post,
    path = "/v1/moderation/reject-batch",
    request_body = RejectBatchRequest,
    responses(
        (status = 200, description = "Batch counts", body = BatchOutcomeResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Role may not moderate", body = crate::error::ErrorBody),
        (status = 422, description = "Batch size or reason out of bounds", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "moderation"
)]
pub(crate) async fn reject_batch(
    State(state): State<AppState>,
    Extension(ctx): Extension<ReviewerContext>,
    body: Result<Json<RejectBatchRequest>, JsonRejection>,
) -> Result<Json<BatchOutcomeResponse>, AppError> {
    ctx.require(PrivilegedOp::ModerateContributions)?;
    let req = extract_validated_json(body)?;
    let ids = to_contribution_ids(&req.contribution_ids);
    let outcome = state
        .moderation
        .reject_batch(&ids, ctx.reviewer_id, &req.reason)
        .await?;
    Ok(Json(BatchOutcomeResponse::from(outcome)))
}

/// GET /v1/moderation/{id}/history — A contribution's audit history,
/// oldest first.
#[utoipa::path(
    get,
    path = "/v1/moderation/{id}/history",
    params(("id" = Uuid, Path, description = "Contribution ID")),
    responses(
        (status = 200, description = "Audit history", body = Vec<ModerationRecordResponse>),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 404, description = "Contribution not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "moderation"
)]
pub(crate) async fn moderation_history(
    State(state): State<AppState>,
    Extension(ctx): Extension<ReviewerContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ModerationRecordResponse>>, AppError> {
    ctx.require(PrivilegedOp::ViewModerationQueue)?;
    let records = state
        .moderation
        .history(ContributionId::from_uuid(id))
        .await?;
    Ok(Json(
        records.iter().map(ModerationRecordResponse::from).collect(),
    ))
}

/// GET /v1/moderation/pending — The pending work queue, oldest first.
#[utoipa::path(
    get,
    path = "/v1/moderation/pending",
    params(
        ("document" = Option<String>, Query, description = "Restrict to one document"),
        ("kind" = Option<String>, Query, description = "Restrict to one contribution kind"),
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 50, max 100)"),
    ),
    responses(
        (status = 200, description = "One page of pending contributions", body = PendingListResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown document or kind", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "moderation"
)]
pub(crate) async fn pending_queue(
    State(state): State<AppState>,
    Extension(ctx): Extension<ReviewerContext>,
    Query(params): Query<PendingParams>,
) -> Result<Json<PendingListResponse>, AppError> {
    ctx.require(PrivilegedOp::ViewModerationQueue)?;
    let filter = PendingFilter {
        document: parse_document(params.document.as_deref())?,
        kind: params
            .kind
            .as_deref()
            .map(|v| v.parse::<ContributionKind>())
            .transpose()
            .map_err(AppError::from)?,
    };
    let page = PageRequest::new(params.page, params.per_page);
    let listed = state.moderation.pending(filter, page).await?;
    Ok(Json(PendingListResponse::from(listed)))
}

fn to_contribution_ids(ids: &[Uuid]) -> Vec<ContributionId> {
    ids.iter().copied().map(ContributionId::from_uuid).collect()
}
