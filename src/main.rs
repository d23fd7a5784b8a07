use anyhow::Context;
use tracing_subscriber::EnvFilter;

use obe_api::config::config;
use obe_api::database::DatabaseManager;
use obe_api::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    tracing::info!("Starting OBE API in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET is not set; logins will fail until it is configured");
    }

    if config.database.run_migrations {
        // A missing database leaves the server up and /health reporting 503
        if let Err(e) = DatabaseManager::migrate().await {
            tracing::warn!("Database migrations not applied: {}", e);
        }
    }

    // Allow tests or deployments to override port via env
    let port = std::env::var("OBE_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("OBE API listening on http://{}", bind_addr);

    axum::serve(listener, routes::app())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    DatabaseManager::close_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
