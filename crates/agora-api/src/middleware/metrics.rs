//! # Prometheus Metrics
//!
//! HTTP traffic metrics are recorded in middleware. Domain gauges
//! (identities, contributions by status, protocols) are refreshed from
//! the store on each `/metrics` scrape; see the handler in `lib.rs`.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{
    Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Latency buckets in seconds. Every route is a single-row read or
/// write; anything past one second is already pathological.
const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.02, 0.05, 0.1, 0.25, 1.0, 5.0];

/// Metric handles plus the registry that owns them.
///
/// Handles are reference-counted inside the prometheus crate, so a
/// clone shares the underlying series.
#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    http_requests: IntCounterVec,
    http_latency: HistogramVec,
    http_errors: IntCounterVec,
    identities: Gauge,
    contributions: GaugeVec,
    protocols: Gauge,
}

impl ApiMetrics {
    /// Create the full metric set on a fresh registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests = must_register(
            &registry,
            IntCounterVec::new(
                Opts::new("agora_http_requests_total", "Total HTTP requests"),
                &["method", "path", "status"],
            )
            .expect("valid metric definition"),
        );
        let http_latency = must_register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "agora_http_request_duration_seconds",
                    "HTTP request latency in seconds",
                )
                .buckets(LATENCY_BUCKETS.to_vec()),
                &["method", "path"],
            )
            .expect("valid metric definition"),
        );
        let http_errors = must_register(
            &registry,
            IntCounterVec::new(
                Opts::new("agora_http_errors_total", "HTTP responses with status >= 400"),
                &["method", "path", "status"],
            )
            .expect("valid metric definition"),
        );

        let identities = must_register(
            &registry,
            Gauge::new("agora_identities_total", "Registered participant identities")
                .expect("valid metric definition"),
        );
        let contributions = must_register(
            &registry,
            GaugeVec::new(
                Opts::new(
                    "agora_contributions_total",
                    "Contributions by moderation status",
                ),
                &["status"],
            )
            .expect("valid metric definition"),
        );
        let protocols = must_register(
            &registry,
            Gauge::new("agora_protocols_total", "Issued protocols")
                .expect("valid metric definition"),
        );

        Self {
            registry,
            http_requests,
            http_latency,
            http_errors,
            identities,
            contributions,
            protocols,
        }
    }

    /// Total requests recorded so far, summed over all labels.
    pub fn requests(&self) -> u64 {
        counter_sum(&self.http_requests)
    }

    /// Total error responses recorded so far, summed over all labels.
    pub fn errors(&self) -> u64 {
        counter_sum(&self.http_errors)
    }

    fn observe(&self, method: &str, path: &str, status: u16, seconds: f64) {
        let code = status.to_string();
        self.http_requests
            .with_label_values(&[method, path, &code])
            .inc();
        self.http_latency
            .with_label_values(&[method, path])
            .observe(seconds);
        if status >= 400 {
            self.http_errors
                .with_label_values(&[method, path, &code])
                .inc();
        }
    }

    // -- Domain gauges, set by the /metrics handler --

    /// Registered identities gauge.
    pub fn identities_total(&self) -> &Gauge {
        &self.identities
    }

    /// Contributions-by-status gauge.
    pub fn contributions_total(&self) -> &GaugeVec {
        &self.contributions
    }

    /// Issued protocols gauge.
    pub fn protocols_total(&self) -> &Gauge {
        &self.protocols
    }

    /// Encode every registered series in text exposition format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| format!("metrics encoding failed: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics are not valid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ApiMetrics {{ requests: {}, errors: {} }}",
            self.requests(),
            self.errors()
        )
    }
}

fn must_register<C>(registry: &Registry, collector: C) -> C
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .expect("collector registers once on a fresh registry");
    collector
}

fn counter_sum(vec: &IntCounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|metric| metric.get_counter().get_value() as u64)
        .sum()
}

/// Collapse high-cardinality path segments into placeholders.
///
/// UUID segments become `{id}` and protocol numbers `{protocol}`, so
/// label cardinality stays bounded by the route table, not by traffic.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if looks_like_uuid(segment) {
                "{id}"
            } else if segment.starts_with("CP-") {
                "{protocol}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn looks_like_uuid(segment: &str) -> bool {
    match segment.len() {
        36 => {
            let mut groups = segment.split('-');
            [8, 4, 4, 4, 12].into_iter().all(|len| {
                groups
                    .next()
                    .is_some_and(|g| g.len() == len && g.bytes().all(|b| b.is_ascii_hexdigit()))
            }) && groups.next().is_none()
        }
        32 => segment.bytes().all(|b| b.is_ascii_hexdigit()),
        _ => false,
    }
}

/// Record one request's method, normalized path, status, and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let handles = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().as_str().to_owned();
    let path = normalize_path(request.uri().path());
    let started = Instant::now();

    let response = next.run(request).await;

    if let Some(metrics) = handles {
        metrics.observe(
            &method,
            &path,
            response.status().as_u16(),
            started.elapsed().as_secs_f64(),
        );
    }
    response
}
