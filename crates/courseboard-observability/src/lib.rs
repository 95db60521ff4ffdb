//! Courseboard Observability
//!
//! Provides configurable observability features including:
//! - Tracing and distributed tracing via OpenTelemetry
//! - Metrics collection via Prometheus
//! - HTTP request/response logging
//!
//! Compiled in with the `observability` feature flag (default). At runtime it
//! is further controlled by the `OBSERVABILITY_ENABLED` environment variable;
//! when disabled, only compact console logging is installed.
//!
//! ```no_run
//! use courseboard_observability::{init_tracing, shutdown_tracer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_tracing()?;
//!     // ... application code ...
//!     shutdown_tracer().await;
//!     Ok(())
//! }
//! ```

pub mod basic_logging;
#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

/// Log targets of the workspace crates, used to build the default filters.
pub(crate) const WORKSPACE_TARGETS: &[&str] = &[
    "courseboard",
    "courseboard_core",
    "courseboard_auth",
    "courseboard_db",
    "courseboard_cli",
];

pub(crate) fn default_directives(level: &str, extra: &str) -> String {
    let mut directives = WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>();
    directives.push(extra.to_string());
    directives.join(",")
}

#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "observability")]
pub use logging::{init_tracing, is_observability_enabled, logging_middleware, shutdown_tracer};
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, metrics_app, metrics_middleware, track_course_capacity_derived,
    track_enrollment_accepted, track_enrollment_rejected, track_entity_created,
    track_schedule_conflict,
};

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    use axum::{extract::Request, middleware::Next, response::Response};

    pub fn is_observability_enabled() -> bool {
        false
    }

    pub async fn logging_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub async fn metrics_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    /// Console logging only.
    pub fn init_tracing() -> anyhow::Result<()> {
        crate::basic_logging::init_basic_console_logging();
        Ok(())
    }

    pub async fn shutdown_tracer() {}

    pub fn track_enrollment_accepted() {}
    pub fn track_enrollment_rejected(_reason: &str) {}
    pub fn track_schedule_conflict(_resource: &str) {}
    pub fn track_course_capacity_derived(_teaching_method: &str) {}
    pub fn track_entity_created(_entity: &str) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
