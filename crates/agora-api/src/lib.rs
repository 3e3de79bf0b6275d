//! # agora-api — Axum HTTP Surface for the Consultation Stack
//!
//! Thin adaptation of the `agora-service` layer onto axum: request
//! DTOs, the error envelope, bearer-token authentication for the
//! reviewer surface, Prometheus metrics, and health probes.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                     | Auth       |
//! |-------------------------|----------------------------|------------|
//! | `/v1/identities/*`      | [`routes::identities`]     | public; reveal privileged |
//! | `/v1/contributions/*`   | [`routes::contributions`]  | public     |
//! | `/v1/moderation/*`      | [`routes::moderation`]     | privileged |
//! | `/v1/protocols/*`       | [`routes::protocols`]      | public     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → [ReviewerAuth on privileged routes] → Handler
//! ```
//!
//! Health probes (`/health/*`) and `/metrics` are mounted outside both
//! the metrics middleware and authentication.
//!
//! ## OpenAPI
//!
//! Auto-generated spec via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use agora_store::StoreError;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Check if metrics are enabled via the `AGORA_METRICS_ENABLED` env
/// var. Defaults to `true` when the variable is absent or set to
/// anything other than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("AGORA_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Registration, contribution intake, the public listings, and protocol
/// routes are unauthenticated. The moderation surface and identity
/// reveal sit behind [`auth::reviewer_auth`]. Health probes and
/// `/metrics` are mounted outside everything.
pub fn app(state: AppState) -> Router {
    let auth_config = state.config.auth();
    let metrics = ApiMetrics::new();
    let metrics_on = metrics_enabled();

    let public = Router::new()
        .merge(routes::identities::router())
        .merge(routes::contributions::router())
        .merge(routes::protocols::router())
        .merge(openapi::router());

    let privileged = Router::new()
        .merge(routes::identities::privileged_router())
        .merge(routes::moderation::router())
        .layer(from_fn(auth::reviewer_auth));

    // Body size limit: 256 KiB. The largest legal request is a batch of
    // 100 UUIDs or a contribution with two 5000-char texts, both far
    // below this.
    let mut api = public
        .merge(privileged)
        .layer(DefaultBodyLimit::max(256 * 1024));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from the store on each scrape (pull model),
/// then gathers and encodes all metrics in text exposition format. A
/// store failure degrades the scrape to HTTP metrics only instead of
/// failing it.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    if let Err(e) = refresh_domain_gauges(&state, &metrics).await {
        tracing::warn!(error = %e, "domain gauge refresh failed; serving HTTP metrics only");
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

async fn refresh_domain_gauges(state: &AppState, metrics: &ApiMetrics) -> Result<(), StoreError> {
    let identities = state.store.count_identities().await?;
    metrics.identities_total().set(identities as f64);

    let counts = state.store.contribution_status_counts().await?;
    let by_status = metrics.contributions_total();
    by_status.reset();
    by_status
        .with_label_values(&["pending"])
        .set(counts.pending as f64);
    by_status
        .with_label_values(&["approved"])
        .set(counts.approved as f64);
    by_status
        .with_label_values(&["rejected"])
        .set(counts.rejected as f64);

    let protocols = state.store.count_protocols().await?;
    metrics.protocols_total().set(protocols as f64);
    Ok(())
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve
/// traffic. In-memory deployments are always ready; PostgreSQL
/// deployments check connectivity.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = state.store.pool() {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
