// Job scheduling service client
//
// The engine never runs generation work itself; it registers a named one-off
// invocation of the content generation service at a future UTC instant.
// Names are deterministic per (business, category, instant), so re-sending
// the same create after a lost response is safe: the service answers 409 and
// that counts as success.

use crate::errors::TriggerError;
use crate::models::TriggerCategory;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Payload delivered to the content generation service when the job fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub business_id: Uuid,
    pub category: TriggerCategory,
    pub context: serde_json::Value,
}

/// A single-fire future invocation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneOffSchedule {
    pub name: String,
    pub run_at: DateTime<Utc>,
    pub payload: GenerationRequest,
}

/// Deterministic schedule name for a candidate, stable across retries of the
/// same detection so the create call is idempotent.
pub fn schedule_name(
    business_id: Uuid,
    category: TriggerCategory,
    run_at: DateTime<Utc>,
) -> String {
    format!(
        "adgen-{}-{}-{}",
        category.as_str(),
        business_id.simple(),
        run_at.timestamp()
    )
}

/// External job scheduling service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Create a one-off invocation. Creating a name that already exists is
    /// not an error.
    async fn create_one_off(&self, schedule: &OneOffSchedule) -> Result<(), TriggerError>;
}

/// HTTP implementation of the scheduling service API.
pub struct SchedulerClient {
    client: Client,
    base_url: String,
}

impl SchedulerClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, TriggerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                TriggerError::SchedulingFailure(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl JobScheduler for SchedulerClient {
    #[tracing::instrument(skip(self, schedule), fields(schedule_name = %schedule.name))]
    async fn create_one_off(&self, schedule: &OneOffSchedule) -> Result<(), TriggerError> {
        let url = format!("{}/v1/schedules", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(schedule)
            .send()
            .await
            .map_err(|e| {
                TriggerError::SchedulingFailure(format!("schedule create failed: {}", e))
            })?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            // Already created by an earlier attempt.
            tracing::debug!("Schedule already exists, treating create as success");
            return Ok(());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TriggerError::SchedulingFailure(format!(
                "schedule create returned status {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
