// Calendar-based trigger rules
//
// The daily run happens at one fixed UTC instant for every business, so two
// businesses evaluated at the same moment can be on different local dates.
// All rules therefore operate on the business-local calendar date, and a
// dispatch target of 10:00 local that has already elapsed in UTC rolls
// forward to the next local day.

use crate::localtime::local_to_utc;
use crate::models::TriggerCategory;
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// One calendar trigger that fired for a business's local date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTrigger {
    pub category: TriggerCategory,
    pub dispatch_at: DateTime<Utc>,
}

pub fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

pub fn is_payday(day_of_month: u32, payday_days: &[u32]) -> bool {
    payday_days.contains(&day_of_month)
}

/// Evaluate the weekend and payday rules for `now` in the business's
/// timezone. Returns the triggers whose rule holds on the local date, each
/// with a dispatch instant at `dispatch_hour_local` that is guaranteed to be
/// in the future. Preference flags are matched by the caller.
pub fn evaluate_calendar_rules(
    now: DateTime<Utc>,
    tz: Tz,
    payday_days: &[u32],
    dispatch_hour_local: u32,
) -> Vec<CalendarTrigger> {
    let local_today = now.with_timezone(&tz).date_naive();
    let mut triggers = Vec::new();

    if is_weekend(local_today.weekday()) {
        if let Some(dispatch_at) = dispatch_instant(now, tz, dispatch_hour_local) {
            triggers.push(CalendarTrigger {
                category: TriggerCategory::Weekend,
                dispatch_at,
            });
        }
    }

    if is_payday(local_today.day(), payday_days) {
        if let Some(dispatch_at) = dispatch_instant(now, tz, dispatch_hour_local) {
            triggers.push(CalendarTrigger {
                category: TriggerCategory::Payday,
                dispatch_at,
            });
        }
    }

    triggers
}

/// Target instant of `hour`:00 local on the current local date, rolled to the
/// next local day when the instant has already elapsed. Positive-offset zones
/// hit the elapsed case routinely: a run fixed at 00:05 UTC is already past
/// 10:00 local at UTC+10.
fn dispatch_instant(now: DateTime<Utc>, tz: Tz, hour: u32) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    let local_today = now.with_timezone(&tz).date_naive();

    match local_to_utc(local_today, time, tz) {
        Some(at) if at > now => Some(at),
        // Already elapsed (or lost in a DST gap): roll to the next local day.
        _ => local_to_utc(local_today + Duration::days(1), time, tz),
    }
}
