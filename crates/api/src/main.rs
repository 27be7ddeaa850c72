use anyhow::Context;

use opportunities_api::app::{build_app, services};
use opportunities_infra::config::{self, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    opportunities_observability::init();

    let config = AppConfig::from_env();
    config.log_summary();

    let (services, worker) = services::build_services(&config).await?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    // Let the job in progress finish and publish before exiting.
    tokio::task::spawn_blocking(move || worker.shutdown())
        .await
        .context("failed to stop ingestion worker")?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
