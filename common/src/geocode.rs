// Geocoding fallback
//
// Operating hours and timezone are preconditions of trigger evaluation. A
// record that has an address but no coordinates or timezone is resolved
// through an external geocoding API once, and the result is cached back onto
// the record by the pipeline. This engine never invents a location.

use crate::errors::TriggerError;
use crate::models::Coordinates;
use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Location data resolved from a street address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub time_zone: Tz,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<ResolvedLocation, TriggerError>;
}

/// HTTP client for a geocoding search API.
pub struct GeocodeClient {
    client: Client,
    base_url: String,
}

impl GeocodeClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, TriggerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                TriggerError::MalformedRecord(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for GeocodeClient {
    #[tracing::instrument(skip(self))]
    async fn resolve(&self, address: &str) -> Result<ResolvedLocation, TriggerError> {
        let url = format!("{}/v1/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("name", address), ("count", "1")])
            .send()
            .await
            .map_err(|e| {
                TriggerError::MalformedRecord(format!("geocoding request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(TriggerError::MalformedRecord(format!(
                "geocoding request returned status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            TriggerError::MalformedRecord(format!("failed to decode geocoding response: {}", e))
        })?;

        let hit = body
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| {
                TriggerError::MalformedRecord(format!("address could not be geocoded: {}", address))
            })?;

        let time_zone = Tz::from_str(&hit.timezone).map_err(|_| {
            TriggerError::MalformedRecord(format!("unknown timezone from geocoder: {}", hit.timezone))
        })?;

        Ok(ResolvedLocation {
            coordinates: Coordinates {
                latitude: hit.latitude,
                longitude: hit.longitude,
            },
            time_zone,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Option<Vec<SearchHit>>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    latitude: f64,
    longitude: f64,
    timezone: String,
}
