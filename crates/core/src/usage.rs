use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of metered consumption for a region.
///
/// Uniquely identified by `(region, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub region: String,
    pub date: NaiveDate,
    /// Litres per day. Never negative.
    pub daily_usage: f64,
}

impl UsageRecord {
    pub fn new(region: impl Into<String>, date: NaiveDate, daily_usage: f64) -> Self {
        Self {
            region: region.into(),
            date,
            daily_usage,
        }
    }
}

/// A usage record annotated with calendar, lag, and rolling features.
///
/// Lag features are `None` while the region's history is too short. They are
/// never imputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub region: String,
    pub date: NaiveDate,
    pub daily_usage: f64,
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u8,
    /// 1..=12.
    pub month: u8,
    pub is_weekend: bool,
    pub prev_day_usage: Option<f64>,
    pub prev_week_usage: Option<f64>,
    pub rolling_mean_7d: f64,
    /// Sample standard deviation; undefined with a single observation.
    pub rolling_std_7d: Option<f64>,
}

impl FeatureRow {
    /// `is_weekend` as the 0/1 covariate used by the models.
    pub fn weekend_flag(&self) -> f64 {
        if self.is_weekend {
            1.0
        } else {
            0.0
        }
    }
}
