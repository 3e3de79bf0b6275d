//! # Application State
//!
//! The shared state handed to every handler: deployment configuration,
//! the storage backend, and the four domain services wired over it.
//! Cloning is cheap; the store and cipher are reference-counted
//! internally.

use std::sync::Arc;

use agora_core::{ReviewerId, ReviewerRole};
use agora_crypto::FieldCipher;
use agora_service::{
    ContributionIntake, IdentityRegistry, LogNotifier, ModerationEngine, NotificationSender,
    ProtocolIssuer,
};
use agora_store::ConsultationStore;

use crate::auth::{AuthConfig, SecretString};

/// Deployment configuration for the API process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port the binary binds.
    pub port: u16,
    /// Bearer token for privileged routes. `None` disables
    /// authentication (development mode).
    pub auth_token: Option<SecretString>,
    /// Reviewer recorded on decisions made through this deployment.
    pub reviewer_id: ReviewerId,
    /// Role granted to the bearer of the token.
    pub reviewer_role: ReviewerRole,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            reviewer_id: ReviewerId::new(),
            reviewer_role: ReviewerRole::SuperAdmin,
        }
    }
}

impl AppConfig {
    /// The authentication extension derived from this configuration.
    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            token: self.auth_token.clone(),
            reviewer_id: self.reviewer_id,
            role: self.reviewer_role,
        }
    }
}

/// Shared application state: configuration, store, and domain services.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: ConsultationStore,
    pub registry: IdentityRegistry,
    pub intake: ContributionIntake,
    pub moderation: ModerationEngine,
    pub issuer: ProtocolIssuer,
}

impl AppState {
    /// Wire the domain services over a store and cipher.
    pub fn new(
        config: AppConfig,
        store: ConsultationStore,
        cipher: FieldCipher,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            registry: IdentityRegistry::new(store.clone(), cipher.clone()),
            intake: ContributionIntake::new(store.clone()),
            moderation: ModerationEngine::new(store.clone()),
            issuer: ProtocolIssuer::new(store.clone(), cipher, notifier),
            config,
            store,
        }
    }

    /// State over a fresh in-memory store with log-only notifications.
    /// Development and test convenience.
    pub fn in_memory(config: AppConfig, cipher: FieldCipher) -> Self {
        Self::new(
            config,
            ConsultationStore::memory(),
            cipher,
            Arc::new(LogNotifier),
        )
    }
}
