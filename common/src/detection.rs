// Forecast window scanning
//
// Slides a fixed-size window over the hourly forecast and reports, per
// category, the earliest run of consecutive hours that all qualify. First
// fit wins deliberately: an earlier marketing opportunity beats a stronger
// one later in the horizon.

use crate::models::{DetectionWindow, ForecastPoint, TriggerCategory, WeatherBaseline};
use chrono::Duration;

/// Multiplier on the baseline standard deviation for hot/cold anomalies.
pub const HOT_COLD_SIGMA: f64 = 1.5;

/// Hourly precipitation above this (mm) counts as rain.
pub const RAIN_THRESHOLD_MM: f64 = 0.2;

/// Scan the ordered hourly forecast for sustained hot, cold, and rain
/// conditions. Returns at most one window per weather category, each the
/// earliest qualifying one. `min_consecutive_hours` rejects transient
/// single-hour spikes.
pub fn scan_forecast(
    points: &[ForecastPoint],
    baseline: WeatherBaseline,
    min_consecutive_hours: u32,
) -> Vec<DetectionWindow> {
    let k = min_consecutive_hours as usize;
    let mut windows = Vec::new();
    if k == 0 || points.len() < k {
        return windows;
    }

    let hot_above = baseline.mean + HOT_COLD_SIGMA * baseline.std_dev;
    let cold_below = baseline.mean - HOT_COLD_SIGMA * baseline.std_dev;

    let mut hot: Option<DetectionWindow> = None;
    let mut cold: Option<DetectionWindow> = None;
    let mut rain: Option<DetectionWindow> = None;

    for slice in points.windows(k) {
        if hot.is_none() && slice.iter().all(|p| p.temperature_c > hot_above) {
            hot = Some(make_window(slice, TriggerCategory::Hot));
        }
        if cold.is_none() && slice.iter().all(|p| p.temperature_c < cold_below) {
            cold = Some(make_window(slice, TriggerCategory::Cold));
        }
        if rain.is_none() && slice.iter().all(|p| p.precipitation_mm > RAIN_THRESHOLD_MM) {
            rain = Some(make_window(slice, TriggerCategory::Rain));
        }
        if hot.is_some() && cold.is_some() && rain.is_some() {
            break;
        }
    }

    windows.extend(hot);
    windows.extend(cold);
    windows.extend(rain);
    windows
}

fn make_window(slice: &[ForecastPoint], category: TriggerCategory) -> DetectionWindow {
    // Points are hourly, so the window covers through the end of its last hour.
    let last = slice.last().expect("window slice is never empty");
    DetectionWindow {
        starts_at: slice[0].at,
        ends_at: last.at + Duration::hours(1),
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn hour(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 14, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn points(temps_and_rain: &[(f64, f64)]) -> Vec<ForecastPoint> {
        temps_and_rain
            .iter()
            .enumerate()
            .map(|(i, &(temperature_c, precipitation_mm))| ForecastPoint {
                at: hour(i as i64),
                temperature_c,
                precipitation_mm,
            })
            .collect()
    }

    const BASELINE: WeatherBaseline = WeatherBaseline {
        mean: 28.0,
        std_dev: 2.0,
    };

    #[test]
    fn test_worked_hot_example() {
        // Threshold is 28 + 1.5 * 2 = 31; hours 0 and 1 both exceed it.
        let forecast = points(&[(32.0, 0.0), (33.0, 0.0), (31.0, 0.0), (30.0, 0.0)]);
        let windows = scan_forecast(&forecast, BASELINE, 2);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].category, TriggerCategory::Hot);
        assert_eq!(windows[0].starts_at, hour(0));
        assert_eq!(windows[0].ends_at, hour(2));
    }

    #[test]
    fn test_transient_spike_rejected() {
        // A single hot hour between normal hours never forms a 2-hour window.
        let forecast = points(&[(29.0, 0.0), (34.0, 0.0), (29.0, 0.0), (28.0, 0.0)]);
        let windows = scan_forecast(&forecast, BASELINE, 2);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_first_fit_not_best_fit() {
        // Hours 1-2 are hot (32, 32); hours 4-5 are hotter (36, 37). The
        // earlier window wins.
        let forecast = points(&[
            (29.0, 0.0),
            (32.0, 0.0),
            (32.0, 0.0),
            (29.0, 0.0),
            (36.0, 0.0),
            (37.0, 0.0),
        ]);
        let windows = scan_forecast(&forecast, BASELINE, 2);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].starts_at, hour(1));
    }

    #[test]
    fn test_rain_threshold_is_exclusive() {
        // Precipitation exactly at the threshold does not qualify.
        let forecast = points(&[(28.0, 0.2), (28.0, 0.2)]);
        assert!(scan_forecast(&forecast, BASELINE, 2).is_empty());

        let forecast = points(&[(28.0, 0.3), (28.0, 0.25)]);
        let windows = scan_forecast(&forecast, BASELINE, 2);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].category, TriggerCategory::Rain);
    }

    #[test]
    fn test_independent_rain_and_cold_windows() {
        // Cold threshold is 28 - 3 = 25. Rainy cold spell yields both.
        let forecast = points(&[(24.0, 0.5), (24.5, 0.6), (26.0, 0.0)]);
        let windows = scan_forecast(&forecast, BASELINE, 2);
        let categories: Vec<_> = windows.iter().map(|w| w.category).collect();
        assert!(categories.contains(&TriggerCategory::Cold));
        assert!(categories.contains(&TriggerCategory::Rain));
        assert!(!categories.contains(&TriggerCategory::Hot));
    }

    #[test]
    fn test_hot_and_cold_never_coexist_in_one_window() {
        // Mutually exclusive by construction: a point cannot be both above
        // mean + 1.5 sigma and below mean - 1.5 sigma.
        let forecast = points(&[(35.0, 0.0), (35.0, 0.0), (20.0, 0.0), (20.0, 0.0)]);
        let windows = scan_forecast(&forecast, BASELINE, 2);
        assert_eq!(windows.len(), 2);
        assert_ne!(windows[0].starts_at, windows[1].starts_at);
    }

    #[test]
    fn test_forecast_shorter_than_window() {
        let forecast = points(&[(35.0, 0.0)]);
        assert!(scan_forecast(&forecast, BASELINE, 2).is_empty());
    }

    #[test]
    fn test_boundary_temperature_does_not_qualify() {
        // Exactly mean + 1.5 sigma is not "greater than".
        let forecast = points(&[(31.0, 0.0), (31.0, 0.0)]);
        assert!(scan_forecast(&forecast, BASELINE, 2).is_empty());
    }
}
