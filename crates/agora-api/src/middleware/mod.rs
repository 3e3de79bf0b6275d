//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - `TraceLayer` (wired in `app`): request/response tracing.
//! - [`metrics`]: Prometheus-compatible request metrics.
//!
//! Authentication middleware lives in [`crate::auth`] because it is
//! attached per-route-group, not globally.

pub mod metrics;
