// HTTP server for the gateway
//
// Serves the message, admin and operational routes on one listener
// (default: 0.0.0.0:3000) until Ctrl-C.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::config::{Config, DEFAULT_ADMIN_PASSWORD};
use crate::metrics;

/// Build the state and router for `config`, bootstrapping the admin user
pub async fn build_app(config: &Config) -> Result<axum::Router> {
    let state = AppState::in_memory(config);

    state
        .admins
        .bootstrap(&config.admin.username, &config.admin.password)
        .await
        .context("Failed to provision admin user")?;
    if config.admin.password == DEFAULT_ADMIN_PASSWORD {
        warn!("Admin user is using the default password; change it via POST /admin/password");
    }

    let timeout = Duration::from_secs(config.server.request_timeout_secs);
    Ok(api::router(state, timeout))
}

/// Start the gateway and block until shutdown
pub async fn serve(config: Config) -> Result<()> {
    if config.metrics.enabled {
        metrics::init().context("Failed to initialize metrics")?;
    }

    let app = build_app(&config).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.server.bind_address, config.server.port
            )
        })?;

    info!(
        strategy = ?config.quota.strategy,
        default_limit = config.quota.default_limit,
        "Starting SMS gateway on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind gateway listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server error")?;

    info!("SMS gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_app_bootstraps_admin() {
        let mut config = Config::default();
        config.admin.password = "not-the-default".to_string();
        assert!(build_app(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_serve_rejects_bad_bind_address() {
        let mut config = Config::default();
        config.metrics.enabled = false;
        config.server.bind_address = "not an address".to_string();
        assert!(serve(config).await.is_err());
    }
}
