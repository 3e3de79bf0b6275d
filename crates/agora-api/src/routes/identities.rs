//! # Participant Identity API
//!
//! Registration (idempotent on the national ID), digest lookup, and the
//! privileged reveal path. Response bodies carry the public projection
//! of an identity; the sealed national ID and email appear only in the
//! reveal response, and only after a capability check.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use agora_core::{
    Cnpj, Cpf, EmailAddress, IdentityId, IndividualCategory, OrganizationNature, ParticipantKind,
    PrivilegedOp, RegionCode, ValidationError,
};
use agora_service::{NewIndividual, NewOrganization, Registration};
use agora_store::IdentityRecord;

use crate::auth::ReviewerContext;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, request_provenance, Validate};
use crate::state::AppState;

/// Request to register an individual participant.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterIndividualRequest {
    /// CPF, formatted or digits-only; check digits are validated.
    pub cpf: String,
    pub email: String,
    /// Full name, 3..=255 characters.
    pub display_name: String,
    /// Two-letter federative unit code, e.g. "SP".
    pub region: String,
    /// One of DENTAL_SURGEON, TECHNICAL_ASSISTANT, STUDENT, RESEARCHER,
    /// CITIZEN, OTHER.
    pub category: String,
    /// Consent acknowledgment; must be `true`.
    pub consent: bool,
}

impl Validate for RegisterIndividualRequest {
    fn validate(&self) -> Result<(), String> {
        if !self.consent {
            return Err("consent must be acknowledged".to_string());
        }
        if self.display_name.trim().is_empty() {
            return Err("display_name must be non-empty".to_string());
        }
        Ok(())
    }
}

impl RegisterIndividualRequest {
    fn into_new(
        self,
        source_ip: String,
        user_agent: Option<String>,
    ) -> Result<NewIndividual, ValidationError> {
        Ok(NewIndividual {
            cpf: Cpf::new(&self.cpf)?,
            email: EmailAddress::new(&self.email)?,
            display_name: self.display_name,
            region: self.region.parse::<RegionCode>()?,
            category: self.category.parse::<IndividualCategory>()?,
            source_ip,
            user_agent,
        })
    }
}

/// Request to register an organization participant.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterOrganizationRequest {
    /// CNPJ, formatted or digits-only; check digits are validated.
    pub cnpj: String,
    /// CPF of the legal representative; stored sealed, never indexed.
    pub representative_cpf: String,
    pub email: String,
    /// Legal name, 3..=255 characters.
    pub display_name: String,
    pub region: String,
    /// One of REGIONAL_COUNCIL, CLASS_ASSOCIATION, UNION,
    /// EDUCATIONAL_INSTITUTION, RESEARCH_CENTER, PRIVATE_COMPANY,
    /// PUBLIC_BODY, NGO, OTHER.
    pub nature: String,
    /// Consent acknowledgment; must be `true`.
    pub consent: bool,
}

impl Validate for RegisterOrganizationRequest {
    fn validate(&self) -> Result<(), String> {
        if !self.consent {
            return Err("consent must be acknowledged".to_string());
        }
        if self.display_name.trim().is_empty() {
            return Err("display_name must be non-empty".to_string());
        }
        Ok(())
    }
}

impl RegisterOrganizationRequest {
    fn into_new(
        self,
        source_ip: String,
        user_agent: Option<String>,
    ) -> Result<NewOrganization, ValidationError> {
        Ok(NewOrganization {
            cnpj: Cnpj::new(&self.cnpj)?,
            representative_cpf: Cpf::new(&self.representative_cpf)?,
            email: EmailAddress::new(&self.email)?,
            display_name: self.display_name,
            region: self.region.parse::<RegionCode>()?,
            nature: self.nature.parse::<OrganizationNature>()?,
            source_ip,
            user_agent,
        })
    }
}

/// Digest lookup parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LookupParams {
    /// CPF or CNPJ, formatted or digits-only.
    pub national_id: String,
    /// INDIVIDUAL or ORGANIZATION.
    pub kind: String,
}

/// The public projection of a registered identity. Sealed fields never
/// appear here.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IdentityResponse {
    pub id: Uuid,
    /// INDIVIDUAL or ORGANIZATION.
    pub kind: String,
    pub display_name: String,
    pub region: String,
    /// Present for individuals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Present for organizations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nature: Option<String>,
    /// RFC 3339 UTC.
    pub consent_at: String,
    /// RFC 3339 UTC.
    pub created_at: String,
}

impl From<&IdentityRecord> for IdentityResponse {
    fn from(record: &IdentityRecord) -> Self {
        Self {
            id: *record.id.as_uuid(),
            kind: record.kind.as_str().to_string(),
            display_name: record.display_name.clone(),
            region: record.region.as_str().to_string(),
            category: record.category.map(|c| c.as_str().to_string()),
            nature: record.nature.map(|n| n.as_str().to_string()),
            consent_at: record.consent_at.to_rfc3339_z(),
            created_at: record.created_at.to_rfc3339_z(),
        }
    }
}

/// Decrypted identifiers for authorized display.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevealResponse {
    pub identity: IdentityResponse,
    /// Decrypted CPF or CNPJ, digits only.
    pub national_id: String,
    /// Decrypted contact email.
    pub email: String,
}

/// Unauthenticated identity routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/identities/individual", post(register_individual))
        .route("/v1/identities/organization", post(register_organization))
        .route("/v1/identities/lookup", get(lookup_identity))
}

/// Routes mounted behind reviewer authentication.
pub fn privileged_router() -> Router<AppState> {
    Router::new().route("/v1/identities/{id}", get(reveal_identity))
}

/// POST /v1/identities/individual — Register an individual.
///
/// Idempotent on the CPF: re-registration returns the existing identity
/// with 200 instead of 201 and changes nothing.
#[utoipa::path(
    post,
    path = "/v1/identities/individual",
    request_body = RegisterIndividualRequest,
    responses(
        (status = 201, description = "Identity created", body = IdentityResponse),
        (status = 200, description = "Identity already registered", body = IdentityResponse),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "identities"
)]
pub(crate) async fn register_individual(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RegisterIndividualRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IdentityResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let (source_ip, user_agent) = request_provenance(&headers);
    let new = req.into_new(source_ip, user_agent)?;
    let registration = state.registry.register_individual(new).await?;
    Ok(registration_response(registration))
}

/// POST /v1/identities/organization — Register an organization.
#[utoipa::path(
    post,
    path = "/v1/identities/organization",
    request_body = RegisterOrganizationRequest,
    responses(
        (status = 201, description = "Identity created", body = IdentityResponse),
        (status = 200, description = "Identity already registered", body = IdentityResponse),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "identities"
)]
pub(crate) async fn register_organization(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RegisterOrganizationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IdentityResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let (source_ip, user_agent) = request_provenance(&headers);
    let new = req.into_new(source_ip, user_agent)?;
    let registration = state.registry.register_organization(new).await?;
    Ok(registration_response(registration))
}

fn registration_response(registration: Registration) -> (StatusCode, Json<IdentityResponse>) {
    let status = if registration.is_new() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(IdentityResponse::from(registration.record())))
}

/// GET /v1/identities/lookup — Find an identity by national ID.
///
/// The plaintext is digested, never stored; the lookup hits the digest
/// index.
#[utoipa::path(
    get,
    path = "/v1/identities/lookup",
    params(
        ("national_id" = String, Query, description = "CPF or CNPJ, formatted or digits-only"),
        ("kind" = String, Query, description = "INDIVIDUAL or ORGANIZATION"),
    ),
    responses(
        (status = 200, description = "Identity found", body = IdentityResponse),
        (status = 404, description = "No identity with this national ID", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed national ID or kind", body = crate::error::ErrorBody),
    ),
    tag = "identities"
)]
pub(crate) async fn lookup_identity(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<IdentityResponse>, AppError> {
    let kind = params.kind.parse::<ParticipantKind>()?;
    let found = state
        .registry
        .find_by_national_id(&params.national_id, kind)
        .await?;
    match found {
        Some(record) => Ok(Json(IdentityResponse::from(&record))),
        None => Err(AppError::NotFound("identity not found".to_string())),
    }
}

/// GET /v1/identities/{id} — Reveal an identity's sealed fields.
///
/// Requires the `ViewIdentityDetails` capability; moderators and
/// analysts are refused.
#[utoipa::path(
    get,
    path = "/v1/identities/{id}",
    params(("id" = Uuid, Path, description = "Identity ID")),
    responses(
        (status = 200, description = "Decrypted identity", body = RevealResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Role lacks the reveal capability", body = crate::error::ErrorBody),
        (status = 404, description = "Identity not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "identities"
)]
pub(crate) async fn reveal_identity(
    State(state): State<AppState>,
    Extension(ctx): Extension<ReviewerContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<RevealResponse>, AppError> {
    ctx.require(PrivilegedOp::ViewIdentityDetails)?;
    let revealed = state.registry.reveal(IdentityId::from_uuid(id)).await?;
    Ok(Json(RevealResponse {
        identity: IdentityResponse::from(&revealed.identity),
        national_id: revealed.national_id,
        email: revealed.email,
    }))
}
