//! # Gaon Wali Chai API server
//!
//! ```text
//! .env / chai.toml / CHAI_* ──► ApiConfig
//!                                  │
//!                                  ▼
//!              Database::new (pool + migrations)
//!                                  │
//!                                  ▼
//!        AppState (services over repositories) ──► axum::serve
//! ```

use anyhow::Context;
use chai_api::{router, sms, ApiConfig, AppState};
use chai_db::{Database, DbConfig};
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chai_api=info,chai_db=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    info!("Starting Gaon Wali Chai API server...");

    let config = ApiConfig::load().context("loading configuration")?;
    let addr = config.bind_addr()?;
    info!(
        %addr,
        sms_provider = ?config.sms.provider,
        expose_otp = config.expose_otp,
        "Configuration loaded"
    );
    if config.expose_otp {
        warn!("OTP codes are echoed in API responses; disable expose_otp in production");
    }

    let db = Database::new(
        DbConfig::from_url(&config.database_url).max_connections(config.db_max_connections),
    )
    .await
    .context("opening database")?;

    let purged = db.sessions().purge_expired(Utc::now()).await?;
    if purged > 0 {
        info!(purged, "Expired token revocations removed");
    }

    let sms = sms::gateway(&config.sms)?;
    let state = AppState::new(db.clone(), &config, sms);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler. Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
