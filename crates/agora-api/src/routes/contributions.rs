//! # Contribution API
//!
//! Submission against a registered identity, the owner's listing, and
//! the public read path. Submitted content is frozen; only moderation
//! state moves afterwards, through the moderation routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use agora_core::{ContributionKind, DocumentCode, IdentityId, ValidationError};
use agora_service::{NewContribution, PageRequest, Paged, PublicContribution};
use agora_store::{ContributionRecord, PublicFilter};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, request_provenance, Validate};
use crate::state::AppState;

/// Request to submit a contribution.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitContributionRequest {
    /// The registered identity making the contribution.
    pub identity_id: Uuid,
    /// CEO or CPEO.
    pub document: String,
    /// Chapter the comment targets, 3..=500 characters.
    pub chapter_title: String,
    /// Optional section within the chapter, up to 500 characters.
    #[serde(default)]
    pub section: Option<String>,
    /// Article label, 1..=100 characters, e.g. "Art. 12".
    pub article: String,
    /// Optional sub-item label, up to 200 characters.
    #[serde(default)]
    pub sub_item: Option<String>,
    /// One of AMEND, ADD, REMOVE, COMMENT.
    pub kind: String,
    /// Proposed wording, 10..=5000 characters.
    pub proposed_text: String,
    /// Supporting rationale, 10..=5000 characters.
    pub rationale: String,
}

impl Validate for SubmitContributionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.chapter_title.trim().is_empty() {
            return Err("chapter_title must be non-empty".to_string());
        }
        if self.article.trim().is_empty() {
            return Err("article must be non-empty".to_string());
        }
        Ok(())
    }
}

impl SubmitContributionRequest {
    fn into_new(
        self,
        source_ip: String,
        user_agent: Option<String>,
    ) -> Result<NewContribution, ValidationError> {
        Ok(NewContribution {
            identity_id: IdentityId::from_uuid(self.identity_id),
            document: self.document.parse::<DocumentCode>()?,
            chapter_title: self.chapter_title,
            section: self.section,
            article: self.article,
            sub_item: self.sub_item,
            kind: self.kind.parse::<ContributionKind>()?,
            proposed_text: self.proposed_text,
            rationale: self.rationale,
            source_ip,
            user_agent,
        })
    }
}

/// A contribution as its owner and reviewers see it. Provenance fields
/// are stored but never served.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContributionResponse {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub document: String,
    pub chapter_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub article: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_item: Option<String>,
    pub kind: String,
    /// PENDING, APPROVED, or REJECTED.
    pub status: String,
    pub proposed_text: String,
    pub rationale: String,
    /// Present iff the status is REJECTED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// RFC 3339 UTC; present once the contribution is decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderated_at: Option<String>,
    /// RFC 3339 UTC.
    pub created_at: String,
}

impl From<&ContributionRecord> for ContributionResponse {
    fn from(record: &ContributionRecord) -> Self {
        Self {
            id: *record.id.as_uuid(),
            identity_id: *record.identity_id.as_uuid(),
            document: record.document.as_str().to_string(),
            chapter_title: record.chapter_title.clone(),
            section: record.section.clone(),
            article: record.article.clone(),
            sub_item: record.sub_item.clone(),
            kind: record.kind.as_str().to_string(),
            status: record.status().as_str().to_string(),
            proposed_text: record.proposed_text.clone(),
            rationale: record.rationale.clone(),
            rejection_reason: record
                .moderation
                .rejection_reason()
                .map(|reason| reason.as_str().to_string()),
            moderated_at: record.moderation.decided_at().map(|at| at.to_rfc3339_z()),
            created_at: record.created_at.to_rfc3339_z(),
        }
    }
}

/// One row of the public listing; only the contributor's displayable
/// fields accompany the content.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicContributionResponse {
    pub id: Uuid,
    pub document: String,
    pub kind: String,
    /// Present location parts joined with `" - "`.
    pub location: String,
    pub proposed_text: String,
    pub rationale: String,
    pub contributor_name: String,
    pub contributor_region: String,
    /// RFC 3339 UTC.
    pub created_at: String,
}

impl From<PublicContribution> for PublicContributionResponse {
    fn from(entry: PublicContribution) -> Self {
        Self {
            id: *entry.id.as_uuid(),
            document: entry.document.as_str().to_string(),
            kind: entry.kind.as_str().to_string(),
            location: entry.location,
            proposed_text: entry.proposed_text,
            rationale: entry.rationale,
            contributor_name: entry.contributor_name,
            contributor_region: entry.contributor_region.as_str().to_string(),
            created_at: entry.created_at.to_rfc3339_z(),
        }
    }
}

/// Public listing filters and pagination.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct PublicListParams {
    /// Restrict to one document (CEO or CPEO).
    pub document: Option<String>,
    /// Exact article label match.
    pub article: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, clamped to 100.
    pub per_page: Option<u32>,
}

/// Owner listing filter.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct OwnerListParams {
    /// Restrict to one document (CEO or CPEO).
    pub document: Option<String>,
}

/// One page of the public listing.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicListResponse {
    pub items: Vec<PublicContributionResponse>,
    pub page: u32,
    pub per_page: u32,
    /// Total matching items across all pages.
    pub total: u64,
    pub total_pages: u64,
}

impl From<Paged<PublicContribution>> for PublicListResponse {
    fn from(paged: Paged<PublicContribution>) -> Self {
        let paged = paged.map(PublicContributionResponse::from);
        Self {
            items: paged.items,
            page: paged.page,
            per_page: paged.per_page,
            total: paged.total,
            total_pages: paged.total_pages,
        }
    }
}

/// Contribution routes; all unauthenticated.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/contributions", post(submit_contribution))
        .route("/v1/contributions/public", get(list_public_contributions))
        .route(
            "/v1/identities/{id}/contributions",
            get(list_identity_contributions),
        )
}

/// POST /v1/contributions — Submit a contribution.
#[utoipa::path(
    post,
    path = "/v1/contributions",
    request_body = SubmitContributionRequest,
    responses(
        (status = 201, description = "Contribution accepted, moderation pending", body = ContributionResponse),
        (status = 404, description = "Identity not registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "contributions"
)]
pub(crate) async fn submit_contribution(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SubmitContributionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ContributionResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let (source_ip, user_agent) = request_provenance(&headers);
    let new = req.into_new(source_ip, user_agent)?;
    let record = state.intake.submit(new).await?;
    Ok((
        StatusCode::CREATED,
        Json(ContributionResponse::from(&record)),
    ))
}

/// GET /v1/identities/{id}/contributions — An identity's submissions,
/// newest first, moderation status included.
#[utoipa::path(
    get,
    path = "/v1/identities/{id}/contributions",
    params(
        ("id" = Uuid, Path, description = "Identity ID"),
        ("document" = Option<String>, Query, description = "Restrict to one document"),
    ),
    responses(
        (status = 200, description = "The identity's contributions", body = Vec<ContributionResponse>),
        (status = 404, description = "Identity not found", body = crate::error::ErrorBody),
    ),
    tag = "contributions"
)]
pub(crate) async fn list_identity_contributions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OwnerListParams>,
) -> Result<Json<Vec<ContributionResponse>>, AppError> {
    let document = parse_document(params.document.as_deref())?;
    let records = state
        .intake
        .list_by_identity(IdentityId::from_uuid(id), document)
        .await?;
    Ok(Json(
        records.iter().map(ContributionResponse::from).collect(),
    ))
}

/// GET /v1/contributions/public — The published listing: APPROVED
/// contributions only, newest first.
#[utoipa::path(
    get,
    path = "/v1/contributions/public",
    params(
        ("document" = Option<String>, Query, description = "Restrict to one document"),
        ("article" = Option<String>, Query, description = "Exact article label match"),
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 50, max 100)"),
    ),
    responses(
        (status = 200, description = "One page of approved contributions", body = PublicListResponse),
        (status = 422, description = "Unknown document code", body = crate::error::ErrorBody),
    ),
    tag = "contributions"
)]
pub(crate) async fn list_public_contributions(
    State(state): State<AppState>,
    Query(params): Query<PublicListParams>,
) -> Result<Json<PublicListResponse>, AppError> {
    let filter = PublicFilter {
        document: parse_document(params.document.as_deref())?,
        article: params.article,
    };
    let page = PageRequest::new(params.page, params.per_page);
    let listed = state.intake.list_public(filter, page).await?;
    Ok(Json(PublicListResponse::from(listed)))
}

/// Parse an optional document query value.
pub(crate) fn parse_document(value: Option<&str>) -> Result<Option<DocumentCode>, AppError> {
    value
        .map(|v| v.parse::<DocumentCode>())
        .transpose()
        .map_err(AppError::from)
}
