mod bootstrap;
mod health;
mod interactions;

use std::time::Duration;

use anyhow::Result;
use guildhall_core::config::{AppConfig, LoadOptions};
use tokio::sync::oneshot;

fn init_logging(config: &AppConfig) {
    use guildhall_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap so connection failures are visible.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let http = health::router(health::HealthState {
        events: app.events.clone(),
        verifications: app.verifications.clone(),
    })
    .merge(interactions::router(app.interactions.clone()));
    let (stop_http, http_stopped) = oneshot::channel::<()>();
    let server = health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        http,
        async move {
            let _ = http_stopped.await;
        },
    )
    .await?;

    let shutdown_grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let runner = app.runner;
    let runner = tokio::spawn(async move { runner.start().await });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "guildhall-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = shutdown_grace.as_secs(),
        "guildhall-server stopping"
    );

    // The runner's transport closes once the endpoint and this sender are gone.
    let _ = stop_http.send(());
    drop(app.interactions);
    let drained = tokio::time::timeout(shutdown_grace, async {
        let _ = server.await;
        runner.await
    })
    .await;
    match drained {
        Ok(Ok(result)) => result?,
        Ok(Err(join_error)) => return Err(join_error.into()),
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            "interaction runner did not drain before the grace period ended"
        ),
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
