// Timezone normalization and the business-hours filter
//
// Both evaluation paths reason in the business's local wall-clock time but
// dispatch in UTC, so every containment check converts first. Operating
// hours are half-open [open, close); a close numerically before open means
// the window wraps past midnight and is treated as two segments.

use crate::models::{DetectionWindow, OperatingHours};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Convert a UTC instant to the business's local time.
pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// Map a local date + wall-clock time to UTC. DST gaps have no valid local
/// representation and ambiguous times two; the earliest valid mapping wins.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

impl OperatingHours {
    /// Wrap-aware containment in the half-open interval [open, close).
    /// open == close is treated as never open rather than always open.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.open_local == self.close_local {
            false
        } else if self.open_local < self.close_local {
            t >= self.open_local && t < self.close_local
        } else {
            // Overnight wrap: [open, midnight) or [midnight, close).
            t >= self.open_local || t < self.close_local
        }
    }
}

/// Whether a detected window falls entirely inside operating hours when
/// expressed in the business's local time. Windows straddling the boundary
/// are discarded entirely.
pub fn window_within_hours(window: &DetectionWindow, tz: Tz, hours: &OperatingHours) -> bool {
    let start = to_local(window.starts_at, tz).time();
    let end = to_local(window.ends_at, tz).time();
    hours.contains(start) && hours.contains(end)
}

/// Whether a single dispatch instant falls inside operating hours, used by
/// the time-based path.
pub fn instant_within_hours(instant: DateTime<Utc>, tz: Tz, hours: &OperatingHours) -> bool {
    hours.contains(to_local(instant, tz).time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TriggerCategory;
    use chrono::Duration;
    use chrono_tz::America::New_York;
    use chrono_tz::Asia::Tokyo;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day_hours() -> OperatingHours {
        OperatingHours {
            open_local: t(8, 0),
            close_local: t(20, 0),
        }
    }

    fn overnight_hours() -> OperatingHours {
        OperatingHours {
            open_local: t(18, 0),
            close_local: t(2, 0),
        }
    }

    #[test]
    fn test_daytime_containment() {
        let hours = day_hours();
        assert!(hours.contains(t(8, 0)));
        assert!(hours.contains(t(14, 0)));
        assert!(!hours.contains(t(20, 0)), "close is exclusive");
        assert!(!hours.contains(t(7, 59)));
    }

    #[test]
    fn test_overnight_wrap_containment() {
        let hours = overnight_hours();
        assert!(hours.contains(t(18, 0)));
        assert!(hours.contains(t(23, 30)));
        assert!(hours.contains(t(0, 0)));
        assert!(hours.contains(t(1, 59)));
        assert!(!hours.contains(t(2, 0)), "close is exclusive");
        assert!(!hours.contains(t(12, 0)));
    }

    #[test]
    fn test_zero_length_hours_never_open() {
        let hours = OperatingHours {
            open_local: t(9, 0),
            close_local: t(9, 0),
        };
        assert!(!hours.contains(t(9, 0)));
        assert!(!hours.contains(t(15, 0)));
    }

    #[test]
    fn test_window_accepted_in_local_afternoon() {
        // 05:00-07:00 UTC is 14:00-16:00 in Tokyo (UTC+9).
        let starts_at = Utc.with_ymd_and_hms(2026, 7, 14, 5, 0, 0).unwrap();
        let window = DetectionWindow {
            starts_at,
            ends_at: starts_at + Duration::hours(2),
            category: TriggerCategory::Hot,
        };
        assert!(window_within_hours(&window, Tokyo, &day_hours()));
    }

    #[test]
    fn test_window_straddling_close_is_discarded() {
        // 10:00-12:00 UTC is 19:00-21:00 in Tokyo; end falls past 20:00 close.
        let starts_at = Utc.with_ymd_and_hms(2026, 7, 14, 10, 0, 0).unwrap();
        let window = DetectionWindow {
            starts_at,
            ends_at: starts_at + Duration::hours(2),
            category: TriggerCategory::Rain,
        };
        assert!(!window_within_hours(&window, Tokyo, &day_hours()));
    }

    #[test]
    fn test_window_inside_overnight_segment() {
        // 03:00-05:00 UTC is 23:00-01:00 in Tokyo, inside an 18:00-02:00 wrap.
        let starts_at = Utc.with_ymd_and_hms(2026, 7, 14, 14, 0, 0).unwrap();
        let window = DetectionWindow {
            starts_at,
            ends_at: starts_at + Duration::hours(2),
            category: TriggerCategory::Cold,
        };
        assert!(window_within_hours(&window, Tokyo, &overnight_hours()));
    }

    #[test]
    fn test_instant_filter_uses_local_time() {
        // 15:00 UTC is 11:00 in New York during DST: inside 08:00-20:00.
        let instant = Utc.with_ymd_and_hms(2026, 7, 14, 15, 0, 0).unwrap();
        assert!(instant_within_hours(instant, New_York, &day_hours()));

        // 02:00 UTC is 22:00 the previous day in New York: outside.
        let instant = Utc.with_ymd_and_hms(2026, 7, 14, 2, 0, 0).unwrap();
        assert!(!instant_within_hours(instant, New_York, &day_hours()));
    }

    #[test]
    fn test_local_to_utc_round_trip() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 14).unwrap();
        let utc = local_to_utc(date, t(10, 0), Tokyo).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 7, 14, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_local_to_utc_dst_gap() {
        // 02:30 on the spring-forward date does not exist in New York.
        let date = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        assert!(local_to_utc(date, t(2, 30), New_York).is_none());
    }
}
