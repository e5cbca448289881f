// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay Service
//!
//! Relays contact form submissions from a static site to a mailbox via the
//! Resend API.
//!
//! ## Configuration
//!
//! Loaded from environment variables (a `.env` file is read first if present):
//!
//! - `RESEND_API_KEY`, `FROM_EMAIL`, `TO_EMAIL`: required
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `ALLOWED_ORIGINS`: Comma-separated origins, or `*` (default: *)
//! - `RATE_LIMIT_MAX`: Requests per window per IP (default: 5)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 60)
//! - `TRUST_FORWARDED_FOR`: Key on `X-Forwarded-For` (default: false)
//! - `RESEND_API_URL`: Provider endpoint (default: https://api.resend.com/emails)
//! - `MAIL_TIMEOUT_SECS`: Outbound request timeout (default: 10)
//! - `ESCAPE_HTML`: HTML-escape submitted values (default: false)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_relay::{
    config::Config,
    handlers::{router, AppState},
    mailer::ResendMailer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Read .env before the filter picks up RUST_LOG
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "Failed to read .env file");
        }
    }

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        allowed_origins = ?config.cors.allowed_origins,
        escape_html = config.mail.escape_html,
        "Starting contact relay"
    );
    if config.cors.allows_any_origin() {
        warn!("CORS allows any origin; set ALLOWED_ORIGINS for production");
    }

    let mailer = ResendMailer::new(&config.mail)?;
    let state = Arc::new(AppState::new(config.clone(), Arc::new(mailer)));

    // Spawn cleanup task
    let cleanup_state = state.clone();
    let cleanup_every = config.rate_limit.window_duration().max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_every);
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    let app = router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown complete");
    Ok(())
}

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
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
