//! # Protocol API
//!
//! Finalization (minting a sequential `CP-` number over an identity's
//! contributions), public lookup by number, and the notification
//! receipt. A protocol's contribution list is frozen at issuance;
//! repeated finalize calls mint new protocols.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use agora_core::{DocumentCode, IdentityId, ProtocolId, ProtocolNumber};
use agora_service::ProtocolView;
use agora_store::{ContributorRef, ProtocolRecord};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::contributions::ContributionResponse;
use crate::state::AppState;

/// Request to finalize an identity's contributions on one document.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FinalizeRequest {
    pub identity_id: Uuid,
    /// CEO or CPEO.
    pub document: String,
}

impl Validate for FinalizeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.document.trim().is_empty() {
            return Err("document must be non-empty".to_string());
        }
        Ok(())
    }
}

/// An issued protocol.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProtocolResponse {
    pub id: Uuid,
    /// `CP-<DOC>-<YYYY>-<NNNNNN>`.
    pub number: String,
    pub identity_id: Uuid,
    pub document: String,
    /// Covered contributions, in submission order; frozen at issuance.
    pub contribution_ids: Vec<Uuid>,
    pub total_contributions: u32,
    /// RFC 3339 with the Brasília offset; its year is the number's
    /// year component.
    pub created_at_local: String,
    /// RFC 3339 UTC.
    pub created_at_utc: String,
    /// RFC 3339 UTC; present once confirmation delivery succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<String>,
}

impl From<&ProtocolRecord> for ProtocolResponse {
    fn from(record: &ProtocolRecord) -> Self {
        Self {
            id: *record.id.as_uuid(),
            number: record.number.to_string(),
            identity_id: *record.identity_id.as_uuid(),
            document: record.document.as_str().to_string(),
            contribution_ids: record
                .contribution_ids
                .iter()
                .map(|id| *id.as_uuid())
                .collect(),
            total_contributions: record.total_contributions,
            created_at_local: record.created_at_local.to_rfc3339(),
            created_at_utc: record.created_at_utc.to_rfc3339_z(),
            notified_at: record.notified_at.map(|at| at.to_rfc3339_z()),
        }
    }
}

/// The contributor's displayable fields, as shown next to a protocol.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContributorResponse {
    pub display_name: String,
    pub region: String,
}

impl From<&ContributorRef> for ContributorResponse {
    fn from(contributor: &ContributorRef) -> Self {
        Self {
            display_name: contributor.display_name.clone(),
            region: contributor.region.as_str().to_string(),
        }
    }
}

/// A protocol joined with its public context.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProtocolViewResponse {
    pub protocol: ProtocolResponse,
    pub contributor: ContributorResponse,
    pub contributions: Vec<ContributionResponse>,
}

impl From<ProtocolView> for ProtocolViewResponse {
    fn from(view: ProtocolView) -> Self {
        Self {
            protocol: ProtocolResponse::from(&view.protocol),
            contributor: ContributorResponse::from(&view.contributor),
            contributions: view
                .contributions
                .iter()
                .map(ContributionResponse::from)
                .collect(),
        }
    }
}

/// Notification receipt acknowledgment.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotifiedResponse {
    pub protocol_id: Uuid,
    /// RFC 3339 UTC. Unchanged when the protocol was already marked.
    pub notified_at: String,
}

/// Protocol routes; all unauthenticated.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/protocols", post(finalize_protocol))
        .route("/v1/protocols/{protocol}", get(lookup_protocol))
        .route("/v1/protocols/{protocol}/notified", post(mark_protocol_notified))
}

/// POST /v1/protocols — Finalize an identity's contributions, minting a
/// protocol number.
#[utoipa::path(
    post,
    path = "/v1/protocols",
    request_body = FinalizeRequest,
    responses(
        (status = 201, description = "Protocol issued", body = ProtocolResponse),
        (status = 404, description = "Identity not found", body = crate::error::ErrorBody),
        (status = 409, description = "Sequence contention exhausted retries", body = crate::error::ErrorBody),
        (status = 422, description = "No contributions to finalize", body = crate::error::ErrorBody),
    ),
    tag = "protocols"
)]
pub(crate) async fn finalize_protocol(
    State(state): State<AppState>,
    body: Result<Json<FinalizeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProtocolResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let document = req.document.parse::<DocumentCode>()?;
    let record = state
        .issuer
        .finalize(IdentityId::from_uuid(req.identity_id), document)
        .await?;
    Ok((StatusCode::CREATED, Json(ProtocolResponse::from(&record))))
}

/// GET /v1/protocols/{protocol} — Look up a protocol by its number.
#[utoipa::path(
    get,
    path = "/v1/protocols/{protocol}",
    params(("protocol" = String, Path, description = "Protocol number, e.g. CP-CEO-2026-000001")),
    responses(
        (status = 200, description = "Protocol with public context", body = ProtocolViewResponse),
        (status = 404, description = "No protocol with this number", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed protocol number", body = crate::error::ErrorBody),
    ),
    tag = "protocols"
)]
pub(crate) async fn lookup_protocol(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<ProtocolViewResponse>, AppError> {
    let number = number.parse::<ProtocolNumber>()?;
    let view = state.issuer.lookup_by_number(&number).await?;
    Ok(Json(ProtocolViewResponse::from(view)))
}

/// POST /v1/protocols/{protocol}/notified — Record confirmation
/// delivery. Idempotent: a second call returns the original timestamp.
#[utoipa::path(
    post,
    path = "/v1/protocols/{protocol}/notified",
    params(("protocol" = Uuid, Path, description = "Protocol ID")),
    responses(
        (status = 200, description = "Delivery recorded", body = NotifiedResponse),
        (status = 404, description = "Protocol not found", body = crate::error::ErrorBody),
    ),
    tag = "protocols"
)]
pub(crate) async fn mark_protocol_notified(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NotifiedResponse>, AppError> {
    let at = state
        .issuer
        .mark_notified(ProtocolId::from_uuid(id))
        .await?;
    Ok(Json(NotifiedResponse {
        protocol_id: id,
        notified_at: at.to_rfc3339_z(),
    }))
}
