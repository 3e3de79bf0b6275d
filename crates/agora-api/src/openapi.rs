//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Reviewer bearer token. Set via AGORA_AUTH_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Agora API — Public Consultation Intake",
        version = "0.3.2",
        description = "Public consultation intake over the consultation document set.\n\nProvides:\n- **Participant registration** (individuals by CPF, organizations by CNPJ), idempotent on the national ID, with sensitive identifiers stored as digest + ciphertext pairs\n- **Contribution intake** with structured document locations and a moderated publication pipeline\n- **Moderation** for reviewers: single and batch decisions with an append-only audit history\n- **Protocol issuance**: sequential `CP-<DOC>-<YYYY>-<NNNNNN>` receipts over an identity's contributions, with outbound confirmation\n\nAuthentication: moderation and identity-reveal routes require `Authorization: Bearer <token>`. Registration, contribution intake, and the public read paths are unauthenticated, as are health probes (`/health/*`) and `/metrics`.",
        license(name = "AGPL-3.0-or-later"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Identities ──────────────────────────────────────────────
        crate::routes::identities::register_individual,
        crate::routes::identities::register_organization,
        crate::routes::identities::lookup_identity,
        crate::routes::identities::reveal_identity,
        // ── Contributions ───────────────────────────────────────────
        crate::routes::contributions::submit_contribution,
        crate::routes::contributions::list_identity_contributions,
        crate::routes::contributions::list_public_contributions,
        // ── Moderation ──────────────────────────────────────────────
        crate::routes::moderation::approve_contribution,
        crate::routes::moderation::reject_contribution,
        crate::routes::moderation::approve_batch,
        crate::routes::moderation::reject_batch,
        crate::routes::moderation::moderation_history,
        crate::routes::moderation::pending_queue,
        // ── Protocols ───────────────────────────────────────────────
        crate::routes::protocols::finalize_protocol,
        crate::routes::protocols::lookup_protocol,
        crate::routes::protocols::mark_protocol_notified,
    ),
    components(
        schemas(
            // ── Error types ─────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Identity DTOs ───────────────────────────────────────
            crate::routes::identities::RegisterIndividualRequest,
            crate::routes::identities::RegisterOrganizationRequest,
            crate::routes::identities::LookupParams,
            crate::routes::identities::IdentityResponse,
            crate::routes::identities::RevealResponse,
            // ── Contribution DTOs ───────────────────────────────────
            crate::routes::contributions::SubmitContributionRequest,
            crate::routes::contributions::ContributionResponse,
            crate::routes::contributions::PublicContributionResponse,
            crate::routes::contributions::PublicListParams,
            crate::routes::contributions::OwnerListParams,
            crate::routes::contributions::PublicListResponse,
            // ── Moderation DTOs ─────────────────────────────────────
            crate::routes::moderation::RejectRequest,
            crate::routes::moderation::ApproveBatchRequest,
            crate::routes::moderation::RejectBatchRequest,
            crate::routes::moderation::DecisionResponse,
            crate::routes::moderation::BatchOutcomeResponse,
            crate::routes::moderation::ModerationRecordResponse,
            crate::routes::moderation::PendingParams,
            crate::routes::moderation::PendingListResponse,
            // ── Protocol DTOs ───────────────────────────────────────
            crate::routes::protocols::FinalizeRequest,
            crate::routes::protocols::ProtocolResponse,
            crate::routes::protocols::ContributorResponse,
            crate::routes::protocols::ProtocolViewResponse,
            crate::routes::protocols::NotifiedResponse,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "identities", description = "Participant registration, digest lookup, and privileged identity reveal"),
        (name = "contributions", description = "Contribution submission, owner listings, and the public read path"),
        (name = "moderation", description = "Reviewer decisions, batches, the pending queue, and audit history"),
        (name = "protocols", description = "Protocol finalization, number lookup, and notification receipts"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates_successfully() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Agora API — Public Consultation Intake");
        assert_eq!(spec.info.version, "0.3.2");
    }

    #[test]
    fn spec_covers_every_route_group() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/identities/individual",
            "/v1/identities/organization",
            "/v1/identities/lookup",
            "/v1/identities/{id}",
            "/v1/contributions",
            "/v1/identities/{id}/contributions",
            "/v1/contributions/public",
            "/v1/moderation/{id}/approve",
            "/v1/moderation/{id}/reject",
            "/v1/moderation/approve-batch",
            "/v1/moderation/reject-batch",
            "/v1/moderation/{id}/history",
            "/v1/moderation/pending",
            "/v1/protocols",
            "/v1/protocols/{protocol}",
            "/v1/protocols/{protocol}/notified",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "spec should contain {path}"
            );
        }
    }
}
