// Baseline calculation from historical daily temperatures
//
// The baseline describes a location's "normal": the mean of up to 30 daily
// mean temperatures and their population standard deviation. The deviation
// is floored so that locations with near-constant climates do not classify
// every mild fluctuation as an anomaly.

use crate::errors::TriggerError;
use crate::models::WeatherBaseline;

/// Minimum standard deviation used for anomaly thresholds, in °C.
pub const SIGMA_FLOOR: f64 = 0.5;

/// Compute the (mean, floored standard deviation) baseline from daily mean
/// temperature samples. Returns `InsufficientBaseline` when no samples are
/// available; the caller skips the business for this cycle.
pub fn compute_baseline(samples: &[f64]) -> Result<WeatherBaseline, TriggerError> {
    if samples.is_empty() {
        return Err(TriggerError::InsufficientBaseline);
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt().max(SIGMA_FLOOR);

    Ok(WeatherBaseline { mean, std_dev })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_samples_is_insufficient() {
        let result = compute_baseline(&[]);
        assert!(matches!(result, Err(TriggerError::InsufficientBaseline)));
    }

    #[test]
    fn test_single_sample_hits_floor() {
        let baseline = compute_baseline(&[21.0]).unwrap();
        assert_eq!(baseline.mean, 21.0);
        assert_eq!(baseline.std_dev, SIGMA_FLOOR);
    }

    #[test]
    fn test_population_std_dev() {
        // Population std dev of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2.
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let baseline = compute_baseline(&samples).unwrap();
        assert!((baseline.mean - 5.0).abs() < 1e-9);
        assert!((baseline.std_dev - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_climate_floors_deviation() {
        let samples = [25.0; 30];
        let baseline = compute_baseline(&samples).unwrap();
        assert_eq!(baseline.std_dev, SIGMA_FLOOR);
    }

    proptest! {
        #[test]
        fn prop_std_dev_never_below_floor(samples in prop::collection::vec(-40.0f64..55.0, 1..31)) {
            let baseline = compute_baseline(&samples).unwrap();
            prop_assert!(baseline.std_dev >= SIGMA_FLOOR);
        }

        #[test]
        fn prop_mean_within_sample_range(samples in prop::collection::vec(-40.0f64..55.0, 1..31)) {
            let baseline = compute_baseline(&samples).unwrap();
            let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(baseline.mean >= min - 1e-9 && baseline.mean <= max + 1e-9);
        }
    }
}
