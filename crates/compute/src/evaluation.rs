//! Chronological hold-out evaluation of the forecaster.

use serde::Serialize;
use tracing::{info, warn};

use aquarisk_core::FeatureRow;

use crate::algorithms::seasonal::SeasonalForecaster;
use crate::pipeline::features::{region_rows, regions};
use crate::pipeline::risk::mask_after_cutoff;

/// Forecast accuracy on one region's held-out tail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEvaluation {
    pub region: String,
    pub mae: f64,
    pub rmse: f64,
    /// Percent; `None` when every held-out actual is zero.
    pub mape: Option<f64>,
    pub train_size: usize,
    pub test_size: usize,
}

/// Index at which a series of `n` rows is split into train and test.
pub fn split_index(n: usize, test_fraction: f64) -> usize {
    ((n as f64) * (1.0 - test_fraction.clamp(0.0, 1.0))).floor() as usize
}

/// Fit a fresh forecaster on each region's head and score it on the tail.
///
/// Regions too short to split are logged and skipped.
pub fn evaluate(table: &[FeatureRow], test_fraction: f64) -> Vec<ForecastEvaluation> {
    let mut results = Vec::new();
    for region in regions(table) {
        let rows = region_rows(table, &region);
        let split = split_index(rows.len(), test_fraction);
        let (train, test) = rows.split_at(split);
        if test.is_empty() {
            warn!(region = %region, rows = rows.len(), "Nothing held out, skipping evaluation");
            continue;
        }

        let forecaster = match SeasonalForecaster::fit(&mask_after_cutoff(train, None)) {
            Ok(f) => f,
            Err(e) => {
                warn!(region = %region, error = %e, "Evaluation fit failed");
                continue;
            }
        };
        let predicted = match forecaster.predict(&mask_after_cutoff(test, None)) {
            Ok(p) => p,
            Err(e) => {
                warn!(region = %region, error = %e, "Evaluation forecast failed");
                continue;
            }
        };
        let actual: Vec<f64> = test.iter().map(|r| r.daily_usage).collect();

        let eval = ForecastEvaluation {
            region: region.clone(),
            mae: mae(&actual, &predicted),
            rmse: rmse(&actual, &predicted),
            mape: mape(&actual, &predicted),
            train_size: train.len(),
            test_size: test.len(),
        };
        info!(
            region = %eval.region,
            mae = eval.mae,
            rmse = eval.rmse,
            mape = eval.mape.unwrap_or(f64::NAN),
            "Hold-out evaluation"
        );
        results.push(eval);
    }
    results
}

fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    let sum: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum();
    sum / actual.len().max(1) as f64
}

fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    let sum: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    (sum / actual.len().max(1) as f64).sqrt()
}

/// Mean absolute percentage error over rows with a non-zero actual.
fn mape(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let terms: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs())
        .collect();
    if terms.is_empty() {
        return None;
    }
    Some(terms.iter().sum::<f64>() / terms.len() as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::features::preprocess;
    use aquarisk_core::UsageRecord;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn split_matches_floor() {
        assert_eq!(split_index(10, 0.2), 8);
        assert_eq!(split_index(7, 0.2), 5);
        assert_eq!(split_index(3, 0.0), 3);
    }

    #[test]
    fn error_metrics() {
        let actual = [100.0, 0.0, 50.0];
        let predicted = [90.0, 5.0, 55.0];
        assert!((mae(&actual, &predicted) - 20.0 / 3.0).abs() < 1e-12);
        assert!((rmse(&actual, &predicted) - 50.0f64.sqrt()).abs() < 1e-12);
        // Zero actual skipped: (10% + 10%) / 2
        assert!((mape(&actual, &predicted).unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(mape(&[0.0], &[1.0]), None);
    }

    #[test]
    fn constant_series_forecasts_exactly() {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let records: Vec<UsageRecord> = (0..50)
            .map(|d| UsageRecord::new("West", start + Duration::days(d), 500.0))
            .collect();
        let results = evaluate(&preprocess(&records), 0.2);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].train_size, 40);
        assert_eq!(results[0].test_size, 10);
        assert!(results[0].mae < 1e-6);
    }

    #[test]
    fn noisy_half_year_holds_out_accurately() {
        use chrono::{Datelike, Weekday};
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let start = NaiveDate::from_ymd_opt(2022, 8, 1).unwrap();
        let records: Vec<UsageRecord> = (0..150)
            .map(|d| {
                let date = start + Duration::days(d);
                let base = match date.weekday() {
                    Weekday::Sat | Weekday::Sun => 9_000.0,
                    _ => 10_000.0,
                };
                UsageRecord::new("North", date, base * rng.gen_range(0.95..1.05))
            })
            .collect();

        let results = evaluate(&preprocess(&records), 0.2);
        assert_eq!(results[0].test_size, 30);
        let mape = results[0].mape.unwrap();
        assert!(mape < 8.0, "hold-out MAPE {mape:.1}%");
        assert!(results[0].mae < 800.0, "hold-out MAE {}", results[0].mae);
    }
}
