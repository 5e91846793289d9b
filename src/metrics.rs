use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::warn;

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if observability is enabled via OBSERVABILITY_ENABLED env var
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Render latency buckets, in seconds.
const RENDER_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Install the Prometheus recorder and its upkeep task.
/// Returns None if observability is disabled or the recorder cannot be installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let installed = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".into()),
            HTTP_LATENCY_BUCKETS,
        )
        .and_then(|b| {
            b.set_buckets_for_metric(
                Matcher::Full("document_render_duration_seconds".into()),
                RENDER_BUCKETS,
            )
        })
        .and_then(|b| b.install_recorder());

    let handle = match installed {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
            return None;
        }
    };

    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            upkeep.run_upkeep();
        }
    });

    Some(handle)
}

fn status_class(status: u16) -> &'static str {
    match status / 100 {
        2 => "2xx",
        3 => "3xx",
        4 => "4xx",
        5 => "5xx",
        _ => "other",
    }
}

/// Counts and times every HTTP request by route template.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let route = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => "unmatched".to_owned(),
    };

    let started = Instant::now();
    gauge!("http_requests_in_flight").increment(1.0);
    let response = next.run(req).await;
    gauge!("http_requests_in_flight").decrement(1.0);

    let status = response.status().as_u16();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status_class(status)
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "route" => route)
        .record(started.elapsed().as_secs_f64());

    response
}

/// Router exposing `/metrics`
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Domain counters. All no-ops when observability is off.

pub fn track_document_generated(document_type: &str, variant: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!(
        "documents_generated_total",
        "document_type" => document_type.to_string(),
        "variant" => variant.to_string()
    )
    .increment(1);
}

pub fn track_document_generation_failure(document_type: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("document_generation_failures_total", "document_type" => document_type.to_string())
        .increment(1);
}

pub fn track_document_render_duration(document_type: &str, duration_secs: f64) {
    if !is_observability_enabled() {
        return;
    }
    histogram!("document_render_duration_seconds", "document_type" => document_type.to_string())
        .record(duration_secs);
}

/// Count a request created or decided into `status` (re-issues included)
pub fn track_request_transition(status: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("requests_transitions_total", "status" => status.to_string()).increment(1);
}

pub fn track_complaint_created() {
    if !is_observability_enabled() {
        return;
    }
    counter!("complaints_created_total").increment(1);
}

pub fn track_complaint_resolved(regenerated: bool) {
    if !is_observability_enabled() {
        return;
    }
    let regenerated = if regenerated { "true" } else { "false" };
    counter!("complaints_resolved_total", "regenerated" => regenerated).increment(1);
}
