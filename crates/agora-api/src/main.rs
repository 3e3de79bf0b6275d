//! Agora API server binary.
//!
//! Configuration comes from the environment:
//! - `AGORA_SECRET` (required): master secret for field encryption.
//! - `AGORA_DIGEST_SALT` (required): salt for lookup digests.
//! - `DATABASE_URL` (optional): PostgreSQL DSN; absent means in-memory
//!   storage.
//! - `AGORA_AUTH_TOKEN` (optional): reviewer bearer token; absent
//!   disables authentication on privileged routes.
//! - `AGORA_REVIEWER_ID`, `AGORA_REVIEWER_ROLE` (optional): the
//!   reviewer identity behind the token; defaults are a generated ID
//!   and SUPER_ADMIN.
//! - `AGORA_PORT` (optional, default 8080).
//! - `RUST_LOG`, `AGORA_LOG_JSON` (optional): log filtering and format.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use agora_api::auth::SecretString;
use agora_api::state::{AppConfig, AppState};
use agora_core::{ReviewerId, ReviewerRole};
use agora_crypto::FieldCipher;
use agora_service::LogNotifier;
use agora_store::ConsultationStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let secret = std::env::var("AGORA_SECRET").context("AGORA_SECRET must be set")?;
    let digest_salt =
        std::env::var("AGORA_DIGEST_SALT").context("AGORA_DIGEST_SALT must be set")?;
    let cipher = FieldCipher::new(&secret, &digest_salt)?;

    let store = init_store().await?;
    let config = config_from_env()?;
    if config.auth_token.is_none() {
        tracing::warn!("AGORA_AUTH_TOKEN not set; privileged routes accept every request");
    }
    let port = config.port;

    let state = AppState::new(config, store, cipher, Arc::new(LogNotifier));
    let app = agora_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "agora-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("AGORA_LOG_JSON")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn init_store() -> anyhow::Result<ConsultationStore> {
    match agora_store::init_pool()
        .await
        .context("failed to initialize PostgreSQL")?
    {
        Some(pool) => Ok(ConsultationStore::postgres(pool)),
        None => Ok(ConsultationStore::memory()),
    }
}

fn config_from_env() -> anyhow::Result<AppConfig> {
    let port = match std::env::var("AGORA_PORT") {
        Ok(v) => v.parse().context("AGORA_PORT must be a port number")?,
        Err(_) => 8080,
    };

    let auth_token = std::env::var("AGORA_AUTH_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .map(SecretString::new);

    let reviewer_id = match std::env::var("AGORA_REVIEWER_ID") {
        Ok(v) => ReviewerId::from_uuid(v.parse().context("AGORA_REVIEWER_ID must be a UUID")?),
        Err(_) => ReviewerId::new(),
    };

    let reviewer_role = match std::env::var("AGORA_REVIEWER_ROLE") {
        Ok(v) => v
            .parse::<ReviewerRole>()
            .context("AGORA_REVIEWER_ROLE must be SUPER_ADMIN, MODERATOR, or ANALYST")?,
        Err(_) => ReviewerRole::SuperAdmin,
    };

    Ok(AppConfig {
        port,
        auth_token,
        reviewer_id,
        reviewer_role,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
