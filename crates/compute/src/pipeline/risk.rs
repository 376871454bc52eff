use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use aquarisk_core::{FeatureRow, RiskResult};

use crate::algorithms::seasonal::ForecastInput;
use crate::model::RegionModel;
use crate::stats::{percent_rank, trailing_mean};

/// Weight of the forecast residual in the fused score.
pub const RESIDUAL_WEIGHT: f64 = 0.6;
/// Weight of the detector severity in the fused score.
pub const ANOMALY_WEIGHT: f64 = 0.4;
/// Causal smoothing window, in rows.
pub const SMOOTHING_WINDOW: usize = 3;

/// Residuals this small relative to the series' mean usage count as an exact
/// fit and carry no severity.
const NEGLIGIBLE_RESIDUAL: f64 = 1e-6;

/// One scored day of a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    pub region: String,
    pub date: NaiveDate,
    pub actual_usage: f64,
    pub predicted_usage: f64,
    pub residual: f64,
    pub abs_residual: f64,
    pub residual_severity: f64,
    pub anomaly_score: f64,
    pub anomaly_severity: f64,
    pub raw_risk: f64,
    /// Smoothed risk in `[0, 100]`.
    pub combined_risk_score: f64,
    pub is_anomaly: bool,
}

/// Forecaster inputs for a region's rows with usage after `cutoff` withheld.
pub fn mask_after_cutoff(rows: &[FeatureRow], cutoff: Option<NaiveDate>) -> Vec<ForecastInput> {
    rows.iter()
        .map(|row| ForecastInput {
            date: row.date,
            is_weekend: row.is_weekend,
            usage: match cutoff {
                Some(c) if row.date > c => None,
                _ => Some(row.daily_usage),
            },
        })
        .collect()
}

/// Fuse forecast residuals and detector output into smoothed risk rows.
///
/// `rows` must belong to the model's region and be in date order.
pub fn build_risk_rows(
    model: &RegionModel,
    rows: &[FeatureRow],
    cutoff: Option<NaiveDate>,
) -> RiskResult<Vec<RiskRow>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let predicted = model.forecaster.predict(&mask_after_cutoff(rows, cutoff))?;
    let assessed = model.anomaly_detector.score_rows(rows);

    let residuals: Vec<f64> = rows
        .iter()
        .zip(&predicted)
        .map(|(row, p)| row.daily_usage - p)
        .collect();
    let abs_residuals: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();

    let usage_level = rows.iter().map(|r| r.daily_usage.abs()).sum::<f64>() / rows.len() as f64;
    let tolerance = NEGLIGIBLE_RESIDUAL * usage_level.max(1.0);
    let residual_severity: Vec<f64> = percent_rank(&abs_residuals)
        .into_iter()
        .zip(&abs_residuals)
        .map(|(rank, abs)| if *abs <= tolerance { 0.0 } else { rank })
        .collect();

    let raw_risk: Vec<f64> = residual_severity
        .iter()
        .zip(&assessed)
        .map(|(r, a)| fuse(*r, a.severity))
        .collect();
    let combined = trailing_mean(&raw_risk, SMOOTHING_WINDOW);

    Ok(rows
        .iter()
        .enumerate()
        .map(|(i, row)| RiskRow {
            region: row.region.clone(),
            date: row.date,
            actual_usage: row.daily_usage,
            predicted_usage: predicted[i],
            residual: residuals[i],
            abs_residual: abs_residuals[i],
            residual_severity: residual_severity[i],
            anomaly_score: assessed[i].score,
            anomaly_severity: assessed[i].severity,
            raw_risk: raw_risk[i],
            combined_risk_score: combined[i].clamp(0.0, 100.0),
            is_anomaly: assessed[i].is_anomaly,
        })
        .collect())
}

/// Weighted fusion of the two severities onto a 0–100 scale.
pub fn fuse(residual_severity: f64, anomaly_severity: f64) -> f64 {
    (RESIDUAL_WEIGHT * residual_severity + ANOMALY_WEIGHT * anomaly_severity) * 100.0
}
