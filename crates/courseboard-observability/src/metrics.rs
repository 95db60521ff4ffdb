use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

pub use crate::logging::is_observability_enabled;

const LATENCY_BUCKETS: &[f64] = &[
    0.002, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Installs the Prometheus recorder and spawns its upkeep task.
///
/// Returns `Ok(None)` when observability is disabled.
pub fn init_metrics() -> anyhow::Result<Option<PrometheusHandle>> {
    if !is_observability_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )
        .context("invalid latency buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            ticker.tick().await;
            upkeep.run_upkeep();
        }
    });

    Ok(Some(handle))
}

/// Keeps `http_requests_in_flight` balanced even if the handler unwinds.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        gauge!("http_requests_in_flight").increment(1.0);
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!("http_requests_in_flight").decrement(1.0);
    }
}

/// Request count and latency per route template.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let _in_flight = InFlight::enter();
    let response = next.run(req).await;
    let status = response.status().as_u16().to_string();

    histogram!(
        "http_request_duration_seconds",
        "method" => method.clone(),
        "route" => route.clone()
    )
    .record(start.elapsed().as_secs_f64());
    counter!("http_requests_total", "method" => method, "route" => route, "status" => status)
        .increment(1);

    response
}

/// Router for the separate metrics listener.
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Business metrics

pub fn track_enrollment_accepted() {
    if !is_observability_enabled() {
        return;
    }
    counter!("enrollments_total", "status" => "accepted").increment(1);
}

/// `reason` is one of `duplicate`, `capacity`.
pub fn track_enrollment_rejected(reason: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("enrollments_total", "status" => "rejected", "reason" => reason.to_string())
        .increment(1);
}

/// `resource` is `classroom` or `teacher`.
pub fn track_schedule_conflict(resource: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("schedule_conflicts_total", "resource" => resource.to_string()).increment(1);
}

pub fn track_course_capacity_derived(teaching_method: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("course_capacity_derivations_total", "teaching_method" => teaching_method.to_string())
        .increment(1);
}

pub fn track_entity_created(entity: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("entities_created_total", "entity" => entity.to_string()).increment(1);
}
