//! # Request Extraction Helpers
//!
//! JSON body handling shared by every POST handler: a [`Validate`] trait
//! for request DTOs and [`extract_validated_json`] to turn both
//! deserialization rejections and validation failures into the 422
//! envelope instead of axum's default plain-text 400.

use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::Json;

use crate::error::AppError;

/// Longest accepted source address (an IPv6 literal fits in 45 chars).
const SOURCE_IP_CAP: usize = 45;

/// Request-shape validation for JSON DTOs.
///
/// Validation here covers only what the DTO itself can see (required
/// flags, enum spellings). Bounds that belong to the domain are checked
/// again in the service layer.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body, mapping rejection and validation failures to
/// [`AppError`].
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Capture request provenance: source address and user agent.
///
/// The source address is the first `X-Forwarded-For` entry when present
/// (the stack deploys behind a reverse proxy), otherwise a placeholder.
/// Oversized forwarded values are truncated to the storage cap rather
/// than failing the request.
pub fn request_provenance(headers: &HeaderMap) -> (String, Option<String>) {
    let source_ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().chars().take(SOURCE_IP_CAP).collect::<String>())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "0.0.0.0".to_string());

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    (source_ip, user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn provenance_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.10, 10.0.0.1"),
        );
        headers.insert(
            axum::http::header::USER_AGENT,
            HeaderValue::from_static("consulta-web/2.1"),
        );
        let (ip, agent) = request_provenance(&headers);
        assert_eq!(ip, "203.0.113.10");
        assert_eq!(agent.as_deref(), Some("consulta-web/2.1"));
    }

    #[test]
    fn provenance_falls_back_when_unproxied() {
        let headers = HeaderMap::new();
        let (ip, agent) = request_provenance(&headers);
        assert_eq!(ip, "0.0.0.0");
        assert!(agent.is_none());
    }

    #[test]
    fn provenance_truncates_oversized_forwarded_values() {
        let mut headers = HeaderMap::new();
        let oversized = "1".repeat(200);
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_str(&oversized).unwrap(),
        );
        let (ip, _) = request_provenance(&headers);
        assert_eq!(ip.len(), SOURCE_IP_CAP);
    }
}
