use anyhow::Context;
use core_runtime::logging::init_logging;
use promo_server::{
    build_router, spawn_event_logger, spawn_state_sweeper, ServerSettings, STATE_SWEEP_INTERVAL,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ServerSettings::from_env().context("invalid server settings")?;
    init_logging(settings.logging.clone()).context("failed to initialize logging")?;
    if settings.ephemeral_cookie_key {
        tracing::warn!("COOKIE_KEY not set, sessions will not survive a restart");
    }

    let service = core_service::bootstrap_from_env().context("failed to initialize service")?;
    let _events = spawn_event_logger(&service);
    let _sweeper = spawn_state_sweeper(&service, STATE_SWEEP_INTERVAL);

    let app = build_router(service, settings.cookie_key.clone(), settings.secure_cookies);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    tracing::info!(addr = %settings.bind_addr, "Promo server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Promo server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
