// Trigger evaluation pipelines
//
// Two pure pipelines over the same business list: the weather path
// (fetch history → baseline → fetch forecast → scan → filter → match →
// dispatch) and the time path (local calendar rules → filter → dispatch).
// Each business is evaluated independently; any per-business failure is
// logged and counted, and the batch moves on. The periodic cadence lives in
// the runner binary, not here.

use crate::baseline::compute_baseline;
use crate::config::TriggerConfig;
use crate::db::repositories::business::BusinessStore;
use crate::detection::scan_forecast;
use crate::dispatch::{Candidate, Dispatcher};
use crate::errors::TriggerError;
use crate::geocode::Geocoder;
use crate::localtime::{instant_within_hours, window_within_hours};
use crate::models::{Business, Coordinates, OperatingHours};
use crate::retry::{with_retries, RetryPolicy};
use crate::rules::evaluate_calendar_rules;
use crate::scheduler_client::JobScheduler;
use crate::weather::ForecastProvider;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Totals for one pipeline run, for logging and operator visibility.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub evaluated: usize,
    pub scheduled: usize,
    pub skipped: usize,
}

pub struct TriggerEngine {
    store: Arc<dyn BusinessStore>,
    forecast: Arc<dyn ForecastProvider>,
    geocoder: Arc<dyn Geocoder>,
    dispatcher: Dispatcher,
    config: TriggerConfig,
    retry: RetryPolicy,
}

impl TriggerEngine {
    pub fn new(
        store: Arc<dyn BusinessStore>,
        forecast: Arc<dyn ForecastProvider>,
        geocoder: Arc<dyn Geocoder>,
        scheduler: Arc<dyn JobScheduler>,
        config: TriggerConfig,
        retry: RetryPolicy,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            scheduler,
            store.clone(),
            config.dedup_horizon_hours(),
            retry,
        );
        Self {
            store,
            forecast,
            geocoder,
            dispatcher,
            config,
            retry,
        }
    }

    /// Weather evaluation pass over every business. Only a failure to list
    /// businesses at all is returned as an error.
    pub async fn run_weather_cycle(&self) -> Result<CycleSummary, TriggerError> {
        self.run_weather_cycle_at(Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn run_weather_cycle_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<CycleSummary, TriggerError> {
        let started = std::time::Instant::now();
        let businesses = self.store.list_businesses().await?;
        info!(count = businesses.len(), "Weather cycle started");

        let mut summary = CycleSummary::default();
        for mut business in businesses {
            summary.evaluated += 1;
            match self.evaluate_weather(&mut business, now).await {
                Ok(scheduled) => summary.scheduled += scheduled,
                Err(e) => {
                    summary.skipped += 1;
                    warn!(business_id = %business.id, error = %e, "Skipping business for this cycle");
                    metrics::counter!("trigger_businesses_skipped_total", "reason" => e.reason())
                        .increment(1);
                }
            }
        }

        metrics::histogram!("trigger_cycle_duration_seconds", "path" => "weather")
            .record(started.elapsed().as_secs_f64());
        info!(
            evaluated = summary.evaluated,
            scheduled = summary.scheduled,
            skipped = summary.skipped,
            "Weather cycle completed"
        );
        Ok(summary)
    }

    /// Daily calendar evaluation pass.
    pub async fn run_time_cycle(&self) -> Result<CycleSummary, TriggerError> {
        self.run_time_cycle_at(Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn run_time_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleSummary, TriggerError> {
        let started = std::time::Instant::now();
        let businesses = self.store.list_businesses().await?;
        info!(count = businesses.len(), "Time-based cycle started");

        let mut summary = CycleSummary::default();
        for mut business in businesses {
            summary.evaluated += 1;
            match self.evaluate_calendar(&mut business, now).await {
                Ok(scheduled) => summary.scheduled += scheduled,
                Err(e) => {
                    summary.skipped += 1;
                    warn!(business_id = %business.id, error = %e, "Skipping business for this cycle");
                    metrics::counter!("trigger_businesses_skipped_total", "reason" => e.reason())
                        .increment(1);
                }
            }
        }

        metrics::histogram!("trigger_cycle_duration_seconds", "path" => "time")
            .record(started.elapsed().as_secs_f64());
        info!(
            evaluated = summary.evaluated,
            scheduled = summary.scheduled,
            skipped = summary.skipped,
            "Time-based cycle completed"
        );
        Ok(summary)
    }

    /// One business through the weather path. Returns the number of jobs
    /// scheduled (0 when nothing qualified).
    async fn evaluate_weather(
        &self,
        business: &mut Business,
        now: DateTime<Utc>,
    ) -> Result<usize, TriggerError> {
        if !business.preferences.weather.hot_sunny
            && !business.preferences.weather.rainy
            && !business.preferences.weather.cool_pleasant
        {
            return Ok(0);
        }

        let (coords, tz) = self.ensure_location(business).await?;
        let hours = required_hours(business)?;

        let history = with_retries(self.retry, || self.forecast.daily_history(coords)).await?;
        let baseline = compute_baseline(&history)?;

        let points = with_retries(self.retry, || {
            self.forecast
                .hourly_forecast(coords, self.config.forecast_horizon_hours)
        })
        .await?;

        let windows = scan_forecast(&points, baseline, self.config.min_consecutive_hours);

        let mut scheduled = 0;
        for window in windows {
            if !business.preferences.allows(window.category) {
                continue;
            }
            if window.ends_at <= now {
                // Spell already over by evaluation time; nothing to promote.
                continue;
            }
            if !window_within_hours(&window, tz, &hours) {
                tracing::debug!(
                    business_id = %business.id,
                    category = %window.category,
                    "Detected window falls outside operating hours"
                );
                continue;
            }

            // The scheduling service only accepts future instants, and the
            // forecast's first hour has usually already begun: an ongoing
            // spell dispatches now instead of at its elapsed start.
            let dispatch_at = window.starts_at.max(now);
            if dispatch_at > window.starts_at && !instant_within_hours(dispatch_at, tz, &hours) {
                continue;
            }

            let candidate = Candidate {
                category: window.category,
                scheduled_at: dispatch_at,
                context: json!({
                    "windowStartsAt": window.starts_at,
                    "windowEndsAt": window.ends_at,
                    "baselineMeanC": baseline.mean,
                    "baselineStdDevC": baseline.std_dev,
                }),
            };
            if self.dispatcher.dispatch(business, candidate).await?
                == crate::dispatch::DispatchOutcome::Scheduled
            {
                scheduled += 1;
            }
        }

        Ok(scheduled)
    }

    /// One business through the calendar path.
    async fn evaluate_calendar(
        &self,
        business: &mut Business,
        now: DateTime<Utc>,
    ) -> Result<usize, TriggerError> {
        if !business.preferences.time_based.weekend_specials
            && !business.preferences.time_based.payday_sales
        {
            return Ok(0);
        }

        let tz = match business.time_zone {
            Some(tz) => tz,
            None => self.ensure_location(business).await?.1,
        };
        let hours = required_hours(business)?;

        let triggers = evaluate_calendar_rules(
            now,
            tz,
            &self.config.payday_days,
            self.config.dispatch_hour_local,
        );

        let mut scheduled = 0;
        for trigger in triggers {
            if !business.preferences.allows(trigger.category) {
                continue;
            }
            if !instant_within_hours(trigger.dispatch_at, tz, &hours) {
                tracing::debug!(
                    business_id = %business.id,
                    category = %trigger.category,
                    "Dispatch target falls outside operating hours"
                );
                continue;
            }

            let local_date = trigger.dispatch_at.with_timezone(&tz).date_naive();
            let candidate = Candidate {
                category: trigger.category,
                scheduled_at: trigger.dispatch_at,
                context: json!({
                    "localDate": local_date,
                    "timeZone": tz.to_string(),
                }),
            };
            if self.dispatcher.dispatch(business, candidate).await?
                == crate::dispatch::DispatchOutcome::Scheduled
            {
                scheduled += 1;
            }
        }

        Ok(scheduled)
    }

    /// Coordinates and timezone for a business, resolving and caching them
    /// through the geocoder when the record lacks them.
    async fn ensure_location(
        &self,
        business: &mut Business,
    ) -> Result<(Coordinates, Tz), TriggerError> {
        if let (Some(coords), Some(tz)) = (business.location, business.time_zone) {
            return Ok((coords, tz));
        }

        let address = business.address.clone().ok_or_else(|| {
            TriggerError::MalformedRecord("record has neither location nor address".to_string())
        })?;

        let resolved = self.geocoder.resolve(&address).await?;
        let new_version = self
            .store
            .cache_location(
                business.id,
                business.version,
                resolved.coordinates,
                resolved.time_zone,
            )
            .await?;

        business.location = Some(resolved.coordinates);
        business.time_zone = Some(resolved.time_zone);
        business.version = new_version;
        info!(business_id = %business.id, "Resolved and cached business location");

        Ok((resolved.coordinates, resolved.time_zone))
    }
}

fn required_hours(business: &Business) -> Result<OperatingHours, TriggerError> {
    business.operating_hours.ok_or_else(|| {
        TriggerError::MalformedRecord("record is missing operating hours".to_string())
    })
}
