use serde::{Deserialize, Serialize};
use tracing::debug;

use aquarisk_core::{FeatureRow, RiskError, RiskResult};

use crate::algorithms::isolation_forest::{ForestConfig, IsolationForest};
use crate::algorithms::scaler::StandardScaler;
use crate::stats::{percent_rank, percentile};

/// Batch quantile at or above which a row is flagged.
pub const ANOMALY_FLAG_QUANTILE: f64 = 0.95;

/// Detector feature vector (usage, day of week, month, weekend flag,
/// previous day, 7-day rolling mean and std), or `None` while a lag or
/// rolling feature is still undefined.
pub fn detector_features(row: &FeatureRow) -> Option<[f64; 7]> {
    Some([
        row.daily_usage,
        row.day_of_week as f64,
        row.month as f64,
        row.weekend_flag(),
        row.prev_day_usage?,
        row.rolling_mean_7d,
        row.rolling_std_7d?,
    ])
}

/// Per-row detector output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnomalyAssessment {
    /// Higher means more anomalous. Zero for rows that were not scored.
    pub score: f64,
    /// Percentile rank of `score` within the scored batch.
    pub severity: f64,
    pub is_anomaly: bool,
}

/// Standardiser plus isolation forest, trained per region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyDetector {
    scaler: StandardScaler,
    forest: IsolationForest,
}

impl AnomalyDetector {
    /// Fit on every row whose features are all defined.
    pub fn fit(rows: &[FeatureRow], config: &ForestConfig) -> RiskResult<Self> {
        let samples: Vec<Vec<f64>> = rows
            .iter()
            .filter_map(detector_features)
            .map(|f| f.to_vec())
            .collect();

        let scaler = StandardScaler::fit(&samples).ok_or_else(|| {
            RiskError::InvalidInput("no rows with complete detector features".to_string())
        })?;
        let scaled: Vec<Vec<f64>> = samples.iter().map(|s| scaler.transform(s)).collect();
        let forest = IsolationForest::fit(&scaled, config)
            .ok_or_else(|| RiskError::InvalidInput("isolation forest fit failed".to_string()))?;

        debug!(samples = samples.len(), trees = forest.n_trees(), "anomaly detector fitted");
        Ok(Self { scaler, forest })
    }

    /// Raw anomaly score of one feature vector.
    pub fn score(&self, features: &[f64]) -> f64 {
        self.forest.anomaly_score(&self.scaler.transform(features))
    }

    /// Score a region's rows as one batch, one assessment per input row.
    ///
    /// Rows with undefined features keep the zero assessment. When usage in
    /// the batch does not vary at all there is nothing to rank and every row
    /// keeps severity 0.
    pub fn score_rows(&self, rows: &[FeatureRow]) -> Vec<AnomalyAssessment> {
        let mut out = vec![AnomalyAssessment::default(); rows.len()];

        let scored: Vec<(usize, f64, f64)> = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| detector_features(row).map(|f| (i, self.score(&f), f[0])))
            .collect();
        if scored.is_empty() {
            return out;
        }

        for &(i, score, _) in &scored {
            out[i].score = score;
        }

        let first_usage = scored[0].2;
        if scored.iter().all(|&(_, _, usage)| usage == first_usage) {
            return out;
        }

        let scores: Vec<f64> = scored.iter().map(|s| s.1).collect();
        let ranks = percent_rank(&scores);
        let flag_at = percentile(&scores, ANOMALY_FLAG_QUANTILE).unwrap_or(f64::INFINITY);

        for (&(i, score, _), rank) in scored.iter().zip(ranks) {
            out[i].severity = rank;
            out[i].is_anomaly = score >= flag_at;
        }
        out
    }
}
