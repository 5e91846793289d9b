use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

use scolarite::logging::init_tracing;
use scolarite::metrics::{init_metrics, metrics_app};
use scolarite::router::init_router;
use scolarite::state::init_app_state;
use scolarite_config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = ServerConfig::from_env();
    init_tracing(&config).context("Failed to initialize tracing")?;

    let state = init_app_state().await?;
    let mut app = init_router(state);

    if config.observability_enabled {
        if let Some(handle) = init_metrics() {
            app = app.merge(metrics_app(handle));
        }
    }

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;

    info!(addr = %config.addr, "Server running");
    println!("🚀 Server running on http://{}", config.addr);
    println!("📚 Swagger UI available at http://{}/swagger-ui", config.addr);
    println!("📖 Scalar UI available at http://{}/scalar", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
