// Trigger runner binary entry point
//
// Owns the periodic cadence: the weather path every few hours, the time
// path once a day. Everything else lives in the common library.

use common::config::Settings;
use common::db::{BusinessRepository, DbPool};
use common::geocode::GeocodeClient;
use common::pipeline::TriggerEngine;
use common::retry::RetryPolicy;
use common::scheduler_client::SchedulerClient;
use common::telemetry;
use common::weather::WeatherClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::load()?;
    settings.validate().map_err(|e| {
        anyhow::anyhow!("Invalid configuration: {}", e)
    })?;

    telemetry::init_logging(&settings.observability.log_level)?;
    telemetry::init_metrics(settings.observability.metrics_port)?;

    info!("Starting AdGen trigger runner");

    info!("Initializing database connection pool");
    let db_pool = DbPool::new(&settings.database).await.map_err(|e| {
        error!(error = %e, "Failed to initialize database pool");
        e
    })?;
    db_pool.migrate().await.map_err(|e| {
        error!(error = %e, "Failed to run migrations");
        e
    })?;
    db_pool.health_check().await.map_err(|e| {
        error!(error = %e, "Database health check failed");
        e
    })?;
    info!("Database ready");

    let store = Arc::new(BusinessRepository::new(db_pool.clone()));
    let forecast = Arc::new(WeatherClient::new(
        &settings.weather_api.base_url,
        settings.weather_api.timeout_seconds,
    )?);
    let scheduler = Arc::new(SchedulerClient::new(
        &settings.scheduler_api.base_url,
        settings.scheduler_api.timeout_seconds,
    )?);
    let geocoder = Arc::new(GeocodeClient::new(
        &settings.geocoder.base_url,
        settings.geocoder.timeout_seconds,
    )?);

    let engine = TriggerEngine::new(
        store,
        forecast,
        geocoder,
        scheduler,
        settings.triggers.clone(),
        RetryPolicy::from_config(&settings.retry),
    );

    let weather_period =
        Duration::from_secs(u64::from(settings.triggers.weather_poll_interval_hours) * 3600);
    let time_period = Duration::from_secs(24 * 3600);

    // First tick of an interval fires immediately, so both paths run once
    // at startup and then settle into their cadence.
    let mut weather_ticker = tokio::time::interval(weather_period);
    let mut time_ticker = tokio::time::interval(time_period);

    info!(
        weather_interval_hours = settings.triggers.weather_poll_interval_hours,
        "Trigger runner started"
    );

    loop {
        tokio::select! {
            _ = weather_ticker.tick() => {
                if let Err(e) = engine.run_weather_cycle().await {
                    error!(error = %e, "Weather cycle failed");
                }
            }
            _ = time_ticker.tick() => {
                if let Err(e) = engine.run_time_cycle().await {
                    error!(error = %e, "Time-based cycle failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C signal, shutting down");
                break;
            }
        }
    }

    db_pool.close().await;
    info!("Trigger runner stopped");
    Ok(())
}
