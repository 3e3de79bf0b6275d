//! # Integration Tests for agora-api
//!
//! Exercises the assembled router end to end over an in-memory store:
//! health probes, registration idempotency, the intake → moderation →
//! public listing flow, protocol issuance, authentication and role
//! gating, and the error envelope shape.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Datelike;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use agora_api::auth::SecretString;
use agora_api::state::{AppConfig, AppState};
use agora_core::{brasilia_now, ReviewerRole};
use agora_crypto::FieldCipher;

const CPF: &str = "111.444.777-35";
const CNPJ: &str = "11.222.333/0001-81";

fn test_cipher() -> FieldCipher {
    FieldCipher::new("integration test master secret", "integration test salt").unwrap()
}

/// Build the test app with authentication disabled.
fn test_app() -> axum::Router {
    let state = AppState::in_memory(AppConfig::default(), test_cipher());
    agora_api::app(state)
}

/// Build the test app with a bearer token and reviewer role.
fn test_app_with_auth(token: &str, role: ReviewerRole) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(SecretString::new(token)),
        reviewer_role: role,
        ..AppConfig::default()
    };
    let state = AppState::in_memory(config, test_cipher());
    agora_api::app(state)
}

async fn send(app: &axum::Router, request: Request<Body>) -> axum::http::Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn individual_request() -> Value {
    json!({
        "cpf": CPF,
        "email": "ana@example.com",
        "display_name": "Ana Beatriz Costa",
        "region": "SP",
        "category": "DENTAL_SURGEON",
        "consent": true,
    })
}

fn contribution_request(identity_id: &str) -> Value {
    json!({
        "identity_id": identity_id,
        "document": "CEO",
        "chapter_title": "Professional conduct",
        "article": "Art. 12",
        "kind": "AMEND",
        "proposed_text": "Replace the notification deadline with thirty days.",
        "rationale": "The current deadline is too short for rural practices.",
    })
}

/// Register the fixture individual and return its ID.
async fn register(app: &axum::Router) -> String {
    let response = send(app, post_json("/v1/identities/individual", individual_request())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

/// Submit a fixture contribution for `identity_id` and return its ID.
async fn submit(app: &axum::Router, identity_id: &str) -> String {
    let response = send(
        app,
        post_json("/v1/contributions", contribution_request(identity_id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn liveness_probe() {
    let app = test_app();
    let response = send(&app, get("/health/liveness")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn readiness_probe_in_memory() {
    let app = test_app();
    let response = send(&app, get("/health/readiness")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn metrics_scrape_includes_domain_gauges() {
    let app = test_app();
    register(&app).await;
    let response = send(&app, get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("agora_identities_total 1"));
    assert!(body.contains("agora_protocols_total 0"));
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let app = test_app();
    let response = send(&app, get("/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let spec = body_json(response).await;
    assert!(spec["paths"]["/v1/contributions"].is_object());
}

// -- Registration -------------------------------------------------------------

#[tokio::test]
async fn registration_is_idempotent_over_http() {
    let app = test_app();

    let first = send(&app, post_json("/v1/identities/individual", individual_request())).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_id = body_json(first).await["id"].as_str().unwrap().to_string();

    // Same CPF, different display name: the original row wins.
    let mut retry = individual_request();
    retry["display_name"] = json!("Ana B. Costa");
    let second = send(&app, post_json("/v1/identities/individual", retry)).await;
    assert_eq!(second.status(), StatusCode::OK);
    let body = body_json(second).await;
    assert_eq!(body["id"].as_str().unwrap(), first_id);
    assert_eq!(body["display_name"], "Ana Beatriz Costa");
}

#[tokio::test]
async fn registration_rejects_bad_check_digits() {
    let app = test_app();
    let mut request = individual_request();
    request["cpf"] = json!("111.444.777-36");
    let response = send(&app, post_json("/v1/identities/individual", request)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn registration_requires_consent() {
    let app = test_app();
    let mut request = individual_request();
    request["consent"] = json!(false);
    let response = send(&app, post_json("/v1/identities/individual", request)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("consent"));
}

#[tokio::test]
async fn organization_registration_round_trips() {
    let app = test_app();
    let response = send(
        &app,
        post_json(
            "/v1/identities/organization",
            json!({
                "cnpj": CNPJ,
                "representative_cpf": CPF,
                "email": "diretoria@conselho.org.br",
                "display_name": "Conselho Regional de Odontologia",
                "region": "RJ",
                "nature": "REGIONAL_COUNCIL",
                "consent": true,
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "ORGANIZATION");
    assert_eq!(body["nature"], "REGIONAL_COUNCIL");
    assert!(body.get("cnpj").is_none());
}

#[tokio::test]
async fn malformed_json_yields_error_envelope() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/identities/individual")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn lookup_finds_registered_identity_by_national_id() {
    let app = test_app();
    let id = register(&app).await;

    let response = send(
        &app,
        get("/v1/identities/lookup?national_id=111.444.777-35&kind=INDIVIDUAL"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"].as_str().unwrap(), id);

    let missing = send(
        &app,
        get("/v1/identities/lookup?national_id=529.982.247-25&kind=INDIVIDUAL"),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body = body_json(missing).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// -- Intake → Moderation → Public Listing -------------------------------------

#[tokio::test]
async fn intake_moderation_public_flow() {
    let app = test_app();
    let identity_id = register(&app).await;
    let contribution_id = submit(&app, &identity_id).await;

    // Pending contributions are invisible publicly.
    let before = send(&app, get("/v1/contributions/public")).await;
    assert_eq!(before.status(), StatusCode::OK);
    assert_eq!(body_json(before).await["total"], 0);

    // Approve (authentication disabled, so the configured reviewer acts).
    let decision = send(
        &app,
        post_json(
            &format!("/v1/moderation/{contribution_id}/approve"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(decision.status(), StatusCode::OK);
    let decision = body_json(decision).await;
    assert_eq!(decision["decided"], true);
    assert_eq!(decision["contribution"]["status"], "APPROVED");

    // Now it is published, joined with the contributor's public fields.
    let after = send(&app, get("/v1/contributions/public?document=CEO")).await;
    assert_eq!(after.status(), StatusCode::OK);
    let raw = body_string(after).await;
    for needle in ["source_ip", "user_agent", "national_id", "ciphertext", "digest"] {
        assert!(!raw.contains(needle), "public listing leaked {needle}: {raw}");
    }
    let listed: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(listed["total"], 1);
    let entry = &listed["items"][0];
    assert_eq!(entry["id"].as_str().unwrap(), contribution_id);
    assert_eq!(entry["contributor_name"], "Ana Beatriz Costa");
    assert_eq!(entry["contributor_region"], "SP");
    assert_eq!(entry["location"], "Professional conduct - Art. 12");

    // The owner listing carries the moderation status.
    let owned = send(
        &app,
        get(&format!("/v1/identities/{identity_id}/contributions")),
    )
    .await;
    assert_eq!(owned.status(), StatusCode::OK);
    let owned = body_json(owned).await;
    assert_eq!(owned[0]["status"], "APPROVED");
}

#[tokio::test]
async fn rejection_reason_reaches_the_owner_not_the_public() {
    let app = test_app();
    let identity_id = register(&app).await;
    let contribution_id = submit(&app, &identity_id).await;

    let decision = send(
        &app,
        post_json(
            &format!("/v1/moderation/{contribution_id}/reject"),
            json!({"reason": "duplicate submission"}),
        ),
    )
    .await;
    assert_eq!(decision.status(), StatusCode::OK);
    assert_eq!(body_json(decision).await["decided"], true);

    let owned = send(
        &app,
        get(&format!("/v1/identities/{identity_id}/contributions")),
    )
    .await;
    let owned = body_json(owned).await;
    assert_eq!(owned[0]["status"], "REJECTED");
    assert_eq!(owned[0]["rejection_reason"], "duplicate submission");

    let public = send(&app, get("/v1/contributions/public")).await;
    assert_eq!(body_json(public).await["total"], 0);
}

#[tokio::test]
async fn second_decision_reports_skip_over_http() {
    let app = test_app();
    let identity_id = register(&app).await;
    let contribution_id = submit(&app, &identity_id).await;

    let approve = send(
        &app,
        post_json(
            &format!("/v1/moderation/{contribution_id}/approve"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(body_json(approve).await["decided"], true);

    // The late conflicting decision is a benign skip, not an error.
    let reject = send(
        &app,
        post_json(
            &format!("/v1/moderation/{contribution_id}/reject"),
            json!({"reason": "duplicate submission"}),
        ),
    )
    .await;
    assert_eq!(reject.status(), StatusCode::OK);
    let body = body_json(reject).await;
    assert_eq!(body["decided"], false);
    assert!(body.get("contribution").is_none());

    // History holds exactly the approval.
    let history = send(
        &app,
        get(&format!("/v1/moderation/{contribution_id}/history")),
    )
    .await;
    let history = body_json(history).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["action"], "APPROVE");
}

#[tokio::test]
async fn batch_moderation_counts_decided_and_skipped() {
    let app = test_app();
    let identity_id = register(&app).await;
    let first = submit(&app, &identity_id).await;
    let second = submit(&app, &identity_id).await;

    let outcome = send(
        &app,
        post_json(
            "/v1/moderation/approve-batch",
            json!({
                "contribution_ids": [first, second, "00000000-0000-0000-0000-000000000000"],
            }),
        ),
    )
    .await;
    assert_eq!(outcome.status(), StatusCode::OK);
    let body = body_json(outcome).await;
    assert_eq!(body["decided"], 2);
    assert_eq!(body["skipped"], 1);
}

#[tokio::test]
async fn pending_queue_filters_by_document() {
    let app = test_app();
    let identity_id = register(&app).await;
    submit(&app, &identity_id).await;

    let queue = send(&app, get("/v1/moderation/pending?document=CEO")).await;
    assert_eq!(queue.status(), StatusCode::OK);
    assert_eq!(body_json(queue).await["total"], 1);

    let other = send(&app, get("/v1/moderation/pending?document=CPEO")).await;
    assert_eq!(body_json(other).await["total"], 0);

    let unknown = send(&app, get("/v1/moderation/pending?document=TAX")).await;
    assert_eq!(unknown.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Protocols ----------------------------------------------------------------

#[tokio::test]
async fn protocol_flow_over_http() {
    let app = test_app();
    let identity_id = register(&app).await;
    submit(&app, &identity_id).await;
    submit(&app, &identity_id).await;

    let year = brasilia_now().year();
    let expected_number = format!("CP-CEO-{year}-000001");

    let issued = send(
        &app,
        post_json(
            "/v1/protocols",
            json!({"identity_id": identity_id, "document": "CEO"}),
        ),
    )
    .await;
    assert_eq!(issued.status(), StatusCode::CREATED);
    let issued = body_json(issued).await;
    assert_eq!(issued["number"].as_str().unwrap(), expected_number);
    assert_eq!(issued["total_contributions"], 2);
    let protocol_id = issued["id"].as_str().unwrap().to_string();

    // Public lookup joins the contributor's displayable fields only.
    let view = send(&app, get(&format!("/v1/protocols/{expected_number}"))).await;
    assert_eq!(view.status(), StatusCode::OK);
    let raw = body_string(view).await;
    assert!(!raw.contains("ana@example.com"), "lookup leaked the email: {raw}");
    let view: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(view["contributor"]["display_name"], "Ana Beatriz Costa");
    assert_eq!(view["contributions"].as_array().unwrap().len(), 2);

    // Recording delivery is idempotent.
    let first = send(
        &app,
        post_json(&format!("/v1/protocols/{protocol_id}/notified"), json!({})),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    let first_at = body_json(first).await["notified_at"].as_str().unwrap().to_string();

    let second = send(
        &app,
        post_json(&format!("/v1/protocols/{protocol_id}/notified"), json!({})),
    )
    .await;
    assert_eq!(
        body_json(second).await["notified_at"].as_str().unwrap(),
        first_at
    );
}

#[tokio::test]
async fn finalize_without_contributions_is_unprocessable() {
    let app = test_app();
    let identity_id = register(&app).await;
    let response = send(
        &app,
        post_json(
            "/v1/protocols",
            json!({"identity_id": identity_id, "document": "CEO"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn protocol_lookup_distinguishes_malformed_from_missing() {
    let app = test_app();

    let malformed = send(&app, get("/v1/protocols/NOT-A-NUMBER")).await;
    assert_eq!(malformed.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing = send(&app, get("/v1/protocols/CP-CEO-2026-000042")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

// -- Authentication & Role Gating ---------------------------------------------

#[tokio::test]
async fn auth_rejects_missing_token() {
    let app = test_app_with_auth("review-token-1", ReviewerRole::SuperAdmin);
    let response = send(
        &app,
        post_json(
            "/v1/moderation/00000000-0000-0000-0000-000000000000/approve",
            json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn auth_rejects_wrong_token() {
    let app = test_app_with_auth("review-token-1", ReviewerRole::SuperAdmin);
    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/v1/moderation/00000000-0000-0000-0000-000000000000/approve")
            .header("authorization", "Bearer wrong-token")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_accepts_valid_token() {
    let app = test_app_with_auth("review-token-1", ReviewerRole::SuperAdmin);
    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/v1/moderation/00000000-0000-0000-0000-000000000000/approve")
            .header("authorization", "Bearer review-token-1")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    // 404 because the contribution does not exist, but auth passed.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_routes_bypass_auth() {
    let app = test_app_with_auth("review-token-1", ReviewerRole::SuperAdmin);

    let health = send(&app, get("/health/liveness")).await;
    assert_eq!(health.status(), StatusCode::OK);

    let public = send(&app, get("/v1/contributions/public")).await;
    assert_eq!(public.status(), StatusCode::OK);

    let registered = send(
        &app,
        post_json("/v1/identities/individual", individual_request()),
    )
    .await;
    assert_eq!(registered.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn analyst_reads_but_cannot_moderate() {
    let app = test_app_with_auth("review-token-1", ReviewerRole::Analyst);

    let queue = send(
        &app,
        Request::builder()
            .uri("/v1/moderation/pending")
            .header("authorization", "Bearer review-token-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(queue.status(), StatusCode::OK);

    let approve = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/v1/moderation/00000000-0000-0000-0000-000000000000/approve")
            .header("authorization", "Bearer review-token-1")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(approve.status(), StatusCode::FORBIDDEN);
    let body = body_json(approve).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn moderator_cannot_reveal_identities() {
    let app = test_app_with_auth("review-token-1", ReviewerRole::Moderator);
    let response = send(
        &app,
        Request::builder()
            .uri("/v1/identities/00000000-0000-0000-0000-000000000000")
            .header("authorization", "Bearer review-token-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn super_admin_reveals_sealed_fields() {
    let app = test_app_with_auth("review-token-1", ReviewerRole::SuperAdmin);
    let identity_id = register(&app).await;

    let response = send(
        &app,
        Request::builder()
            .uri(format!("/v1/identities/{identity_id}"))
            .header("authorization", "Bearer review-token-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["national_id"], "11144477735");
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(body["identity"]["display_name"], "Ana Beatriz Costa");
}
