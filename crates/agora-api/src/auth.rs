//! # Bearer-Token Authentication
//!
//! Privileged routes (identity reveal, the whole moderation surface)
//! sit behind a shared bearer token checked in constant time. The
//! reviewer identity and role attached to authenticated requests come
//! from deployment configuration; there is no user database behind the
//! token. When no token is configured the API runs in development mode
//! and privileged routes accept every request.

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use agora_core::{PrivilegedOp, ReviewerId, ReviewerRole};

use crate::error::AppError;

/// A secret value held in memory.
///
/// Comparison is constant-time and the backing buffer is wiped on drop.
/// Debug output never shows the value.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Constant-time equality against a presented candidate.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString(***)")
    }
}

/// Authentication configuration carried as a request extension.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` disables authentication.
    pub token: Option<SecretString>,
    /// Reviewer recorded on moderation decisions made through this
    /// deployment.
    pub reviewer_id: ReviewerId,
    /// Role evaluated against each privileged operation.
    pub role: ReviewerRole,
}

/// The authenticated reviewer attached to a privileged request.
#[derive(Debug, Clone, Copy)]
pub struct ReviewerContext {
    pub reviewer_id: ReviewerId,
    pub role: ReviewerRole,
}

impl ReviewerContext {
    /// Check that this reviewer may perform `op`.
    pub fn require(&self, op: PrivilegedOp) -> Result<(), AppError> {
        if self.role.permits(op) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "role {} may not perform this operation",
                self.role
            )))
        }
    }
}

/// Middleware guarding privileged routes.
///
/// Validates the `Authorization: Bearer` header against the configured
/// token and injects a [`ReviewerContext`] for handlers. With no token
/// configured, requests pass through with the configured context.
pub async fn reviewer_auth(
    Extension(auth): Extension<AuthConfig>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = &auth.token {
        let presented = bearer_token(&request)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
        if !expected.matches(presented) {
            return Err(AppError::Unauthorized("invalid bearer token".to_string()));
        }
    }

    request.extensions_mut().insert(ReviewerContext {
        reviewer_id: auth.reviewer_id,
        role: auth.role,
    });
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}
