use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use form_mailer::config::{ServerConfig, Settings};
use form_mailer::server::{AppState, form_routes};
use form_mailer::sinks::SmtpMailer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    let _log_guard = form_mailer::logging::init(config.log_dir.as_deref());

    if !config.forms_dir.is_dir() {
        tracing::warn!(
            forms_dir = %config.forms_dir.display(),
            "Forms directory does not exist; every request will be 404"
        );
    }

    let state = AppState::new(
        config.forms_dir.clone(),
        Settings::from_env(),
        Arc::new(SmtpMailer::new()),
    );
    let app = form_routes(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    tracing::info!(
        addr = %config.bind_addr(),
        forms_dir = %config.forms_dir.display(),
        "form-mailer v{} started",
        env!("CARGO_PKG_VERSION")
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("form-mailer stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
