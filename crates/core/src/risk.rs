use serde::{Deserialize, Serialize};

/// Recent-peak threshold at or above which a region is High risk.
pub const HIGH_PEAK_THRESHOLD: f64 = 70.0;
/// Recent-peak threshold at or above which a region is Medium risk.
pub const MEDIUM_PEAK_THRESHOLD: f64 = 40.0;
/// Single-day score above which a day is reported as high-risk.
pub const HIGH_RISK_DAY_THRESHOLD: f64 = 70.0;

/// Inspection risk level derived from a region's recent peak score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a recent-peak risk. Both thresholds are inclusive.
    pub fn from_peak(recent_peak_risk: f64) -> Self {
        if recent_peak_risk >= HIGH_PEAK_THRESHOLD {
            RiskLevel::High
        } else if recent_peak_risk >= MEDIUM_PEAK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Direction of the last week's mean risk compared with the week before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskTrend {
    Increasing,
    Decreasing,
}

/// Whether a single day's combined score counts as a high-risk day.
pub fn is_high_risk_day(score: f64) -> bool {
    score > HIGH_RISK_DAY_THRESHOLD
}
