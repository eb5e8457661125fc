// Weather data service client
//
// The engine needs two reads per business and cycle: ~30 daily mean
// temperatures for the baseline, and the hourly forward forecast for the
// scanner. Both come from an Open-Meteo-shaped HTTP API addressed by
// coordinate. Transport, decode, and shape problems all collapse into
// DataUnavailable: the business is skipped and retried next cycle.

use crate::errors::TriggerError;
use crate::models::{Coordinates, ForecastPoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Days of history requested for the baseline.
const HISTORY_DAYS: u32 = 30;

/// Read access to forecast and historical weather for a coordinate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Daily mean temperatures for the trailing history window, oldest first.
    async fn daily_history(&self, coords: Coordinates) -> Result<Vec<f64>, TriggerError>;

    /// Hourly forecast points covering the next `horizon_hours`, in order.
    async fn hourly_forecast(
        &self,
        coords: Coordinates,
        horizon_hours: u32,
    ) -> Result<Vec<ForecastPoint>, TriggerError>;
}

/// HTTP client for an Open-Meteo-style forecast API.
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, TriggerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                TriggerError::DataUnavailable(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_forecast(
        &self,
        query: &[(&str, String)],
    ) -> Result<ForecastResponse, TriggerError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| TriggerError::DataUnavailable(format!("forecast request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(TriggerError::DataUnavailable(format!(
                "forecast request returned status {}",
                response.status()
            )));
        }

        response.json::<ForecastResponse>().await.map_err(|e| {
            TriggerError::DataUnavailable(format!("failed to decode forecast response: {}", e))
        })
    }
}

#[async_trait]
impl ForecastProvider for WeatherClient {
    #[tracing::instrument(skip(self))]
    async fn daily_history(&self, coords: Coordinates) -> Result<Vec<f64>, TriggerError> {
        let query = [
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("daily", "temperature_2m_mean".to_string()),
            ("past_days", HISTORY_DAYS.to_string()),
            ("forecast_days", "0".to_string()),
            ("timeformat", "unixtime".to_string()),
            ("timezone", "UTC".to_string()),
        ];

        let body = self.get_forecast(&query).await?;
        let daily = body.daily.ok_or_else(|| {
            TriggerError::DataUnavailable("forecast response missing daily block".to_string())
        })?;

        // Providers pad unavailable days with nulls; those are dropped, not
        // treated as errors. An all-null answer surfaces later as an
        // insufficient baseline.
        Ok(daily.temperature_2m_mean.into_iter().flatten().collect())
    }

    #[tracing::instrument(skip(self))]
    async fn hourly_forecast(
        &self,
        coords: Coordinates,
        horizon_hours: u32,
    ) -> Result<Vec<ForecastPoint>, TriggerError> {
        let query = [
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("hourly", "temperature_2m,precipitation".to_string()),
            ("forecast_hours", horizon_hours.to_string()),
            ("timeformat", "unixtime".to_string()),
            ("timezone", "UTC".to_string()),
        ];

        let body = self.get_forecast(&query).await?;
        let hourly = body.hourly.ok_or_else(|| {
            TriggerError::DataUnavailable("forecast response missing hourly block".to_string())
        })?;

        if hourly.time.len() != hourly.temperature_2m.len()
            || hourly.time.len() != hourly.precipitation.len()
        {
            return Err(TriggerError::DataUnavailable(
                "hourly series lengths disagree".to_string(),
            ));
        }

        let mut points = Vec::with_capacity(hourly.time.len());
        for ((epoch, temperature_c), precipitation_mm) in hourly
            .time
            .into_iter()
            .zip(hourly.temperature_2m)
            .zip(hourly.precipitation)
        {
            let at = DateTime::<Utc>::from_timestamp(epoch, 0).ok_or_else(|| {
                TriggerError::DataUnavailable(format!("invalid forecast timestamp {}", epoch))
            })?;
            points.push(ForecastPoint {
                at,
                temperature_c,
                precipitation_mm,
            });
        }

        points.truncate(horizon_hours as usize);
        Ok(points)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Option<HourlySeries>,
    daily: Option<DailySeries>,
}

#[derive(Debug, Deserialize)]
struct HourlySeries {
    time: Vec<i64>,
    temperature_2m: Vec<f64>,
    precipitation: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    #[allow(dead_code)]
    time: Vec<i64>,
    temperature_2m_mean: Vec<Option<f64>>,
}
