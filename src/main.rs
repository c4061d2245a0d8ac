use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use alimenta::api::{app_router, ApiContext};
use alimenta::config::{self, AppConfig};
use alimenta::db::sqlite::open_database;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(err) = run().await {
        tracing::error!(error = %err, "startup failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let conn = open_database(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "database ready");

    let addr = config.bind_addr;
    let ctx = ApiContext::new(conn, config);
    let app = app_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
