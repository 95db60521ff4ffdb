use anyhow::Context;
use courseboard::router::init_router;
use courseboard::state::init_app_state;
use courseboard_config::ServerConfig;
use courseboard_db::run_migrations;
use courseboard_observability::{init_tracing, shutdown_tracer};
use dotenvy::dotenv;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    init_tracing()?;

    let server_config = ServerConfig::from_env();
    let state = init_app_state().await?;

    run_migrations(&state.db)
        .await
        .context("failed to run database migrations")?;

    #[cfg(feature = "observability")]
    if let Some(handle) = courseboard_observability::init_metrics()? {
        let metrics_address = server_config.metrics_address();
        let metrics_listener = tokio::net::TcpListener::bind(&metrics_address)
            .await
            .with_context(|| format!("failed to bind metrics listener on {metrics_address}"))?;
        info!(address = %metrics_address, "Prometheus metrics available at /metrics");

        tokio::spawn(async move {
            if let Err(e) =
                axum::serve(metrics_listener, courseboard_observability::metrics_app(handle)).await
            {
                tracing::error!(error = %e, "metrics server stopped");
            }
        });
    }

    let app = init_router(state);

    let address = server_config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(address = %address, "Server running");
    info!("Swagger UI available at /swagger-ui, Scalar at /scalar");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    shutdown_tracer().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("Shutting down");
}
