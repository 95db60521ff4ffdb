use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::default_directives;

/// Installs compact console logging, used when observability is turned off.
///
/// The level comes from `LOG_LEVEL` (default `info`) unless `RUST_LOG` is set;
/// noisy dependencies are held at `warn`.
pub fn init_basic_console_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directives(
            &log_level,
            "tower_http=warn,hyper=warn,tonic=warn,h2=warn,sqlx=warn",
        ))
    });

    let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true)
        .with_filter(env_filter);

    // A subscriber may already be installed (tests, CLI)
    let _ = tracing_subscriber::registry().with(console_layer).try_init();

    eprintln!(
        "Observability disabled - console logging only (OBSERVABILITY_ENABLED=false or feature not compiled)"
    );
}
