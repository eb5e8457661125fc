// Schedule dispatcher and dedup ledger
//
// The only stateful step of either pipeline. A candidate survives detection,
// the hours filter, and preference matching before it arrives here; this
// module decides whether it is new work, registers the one-off invocation
// with the external scheduling service, and records it on the business.
//
// Ordering matters: the pending entry is appended only after the scheduling
// service accepted the create. A failed create leaves no entry, and the next
// cycle re-detects and retries. A created schedule whose append then loses a
// version race is re-checked against the fresh ledger; the deterministic
// schedule name makes the external create idempotent in that race.

use crate::db::repositories::business::BusinessStore;
use crate::errors::{StoreError, TriggerError};
use crate::models::{Business, PendingJob, TriggerCategory};
use crate::retry::{with_retries, RetryPolicy};
use crate::scheduler_client::{schedule_name, GenerationRequest, JobScheduler, OneOffSchedule};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::instrument;

/// A detection that passed every filter and is ready to schedule.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub category: TriggerCategory,
    pub scheduled_at: DateTime<Utc>,
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Scheduled,
    /// An equivalent job was already pending. Expected, silent no-op.
    DuplicateSuppressed,
}

pub struct Dispatcher {
    scheduler: Arc<dyn JobScheduler>,
    store: Arc<dyn BusinessStore>,
    dedup_horizon: Duration,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(
        scheduler: Arc<dyn JobScheduler>,
        store: Arc<dyn BusinessStore>,
        dedup_horizon_hours: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            scheduler,
            store,
            dedup_horizon: Duration::hours(dedup_horizon_hours as i64),
            retry,
        }
    }

    /// Dispatch one candidate for `business`. On success the in-memory
    /// record is updated to mirror the store (entry appended, version
    /// bumped), so later candidates in the same cycle dedup against it.
    #[instrument(skip(self, business, candidate), fields(business_id = %business.id, category = %candidate.category))]
    pub async fn dispatch(
        &self,
        business: &mut Business,
        candidate: Candidate,
    ) -> Result<DispatchOutcome, TriggerError> {
        if self.is_duplicate(&business.upcoming_jobs, candidate.category, candidate.scheduled_at) {
            tracing::debug!("Equivalent job already pending, suppressing");
            metrics::counter!(
                "trigger_duplicates_suppressed_total",
                "category" => candidate.category.as_str()
            )
            .increment(1);
            return Ok(DispatchOutcome::DuplicateSuppressed);
        }

        let schedule = OneOffSchedule {
            name: schedule_name(business.id, candidate.category, candidate.scheduled_at),
            run_at: candidate.scheduled_at,
            payload: GenerationRequest {
                business_id: business.id,
                category: candidate.category,
                context: candidate.context.clone(),
            },
        };

        with_retries(self.retry, || self.scheduler.create_one_off(&schedule)).await?;

        let job = PendingJob {
            category: candidate.category,
            context: candidate.context,
            scheduled_at: candidate.scheduled_at,
            schedule_name: schedule.name,
        };

        match self
            .store
            .append_pending_job(business.id, business.version, &job)
            .await
        {
            Ok(()) => {}
            Err(StoreError::VersionConflict(_)) => {
                // A concurrent writer touched the record between our read and
                // this append. Re-read, re-check the ledger, and try the
                // append once more against the fresh version.
                tracing::debug!("Version conflict on append, re-reading record");
                let fresh = self.store.fetch(business.id).await?;
                *business = fresh;

                if self.is_duplicate(&business.upcoming_jobs, job.category, job.scheduled_at) {
                    tracing::debug!("Concurrent writer already recorded equivalent job");
                    metrics::counter!(
                        "trigger_duplicates_suppressed_total",
                        "category" => job.category.as_str()
                    )
                    .increment(1);
                    return Ok(DispatchOutcome::DuplicateSuppressed);
                }

                self.store
                    .append_pending_job(business.id, business.version, &job)
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }

        // Mirror the store-side mutation.
        business.upcoming_jobs.push(job);
        business.version += 1;

        metrics::counter!(
            "trigger_jobs_scheduled_total",
            "category" => candidate.category.as_str()
        )
        .increment(1);
        tracing::info!(scheduled_at = %candidate.scheduled_at, "Generation job scheduled");

        Ok(DispatchOutcome::Scheduled)
    }

    /// Two jobs of the same category whose scheduled instants fall within one
    /// dedup horizon of each other are the same opportunity.
    fn is_duplicate(
        &self,
        pending: &[PendingJob],
        category: TriggerCategory,
        scheduled_at: DateTime<Utc>,
    ) -> bool {
        pending.iter().any(|job| {
            job.category == category && (job.scheduled_at - scheduled_at).abs() < self.dedup_horizon
        })
    }
}
