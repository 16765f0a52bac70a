use std::time::Duration;

use anyhow::Context;

use stowline_api::config::AppConfig;
use stowline_observability::LogFormat;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    stowline_observability::init_with(LogFormat::for_environment(config.environment.is_production()), "info");

    let (app, services) = stowline_api::app::build_app(&config).await?;

    // Drop timed-out sessions so the registry does not grow without bound.
    let sessions = services.sessions();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            let removed = sessions.sweep();
            if removed > 0 {
                tracing::debug!(removed, "expired sessions swept");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, env = ?config.environment, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
