use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use aquarisk_core::{is_high_risk_day, FeatureRow, RiskError, RiskResult, UsageRecord};

use crate::model::{ModelSet, MODEL_TYPE};
use crate::pipeline::features::{preprocess, regions};
use crate::pipeline::ranking::{rank_regions, region_ranking, risk_analysis, RegionRanking, RiskAnalysis};
use crate::pipeline::risk::RiskRow;
use crate::pipeline::score_region;

/// Whether a model set backs the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Loaded,
    NotLoaded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub status: LoadStatus,
    pub model_type: &'static str,
    pub regions_available: usize,
    pub trained_at: Option<DateTime<Utc>>,
    pub residual_thresholds: IndexMap<String, f64>,
}

/// Per-region outcome counts over the whole scored series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub region: String,
    pub days: usize,
    pub anomalies: usize,
    pub high_risk_days: usize,
    pub residual_threshold: f64,
}

impl DetectionSummary {
    pub fn anomaly_pct(&self) -> f64 {
        pct(self.anomalies, self.days)
    }

    pub fn high_risk_pct(&self) -> f64 {
        pct(self.high_risk_days, self.days)
    }
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Immutable query context: the preprocessed table plus the loaded models.
///
/// Built once at startup and shared read-only. Every query recomputes the
/// affected regions from scratch.
pub struct RiskContext {
    table: Vec<FeatureRow>,
    models: Option<ModelSet>,
    cutoff: Option<NaiveDate>,
}

impl RiskContext {
    pub fn new(table: Vec<FeatureRow>, models: Option<ModelSet>, cutoff: Option<NaiveDate>) -> Self {
        Self { table, models, cutoff }
    }

    /// Preprocess raw records and wrap them with the models.
    pub fn from_records(records: &[UsageRecord], models: Option<ModelSet>, cutoff: Option<NaiveDate>) -> Self {
        Self::new(preprocess(records), models, cutoff)
    }

    pub fn models(&self) -> Option<&ModelSet> {
        self.models.as_ref()
    }

    /// Region names in ascending order.
    pub fn regions(&self) -> Vec<String> {
        regions(&self.table)
    }

    /// Full scored series for one region.
    pub fn timeseries(&self, region: &str) -> RiskResult<Vec<RiskRow>> {
        let models = self
            .models
            .as_ref()
            .ok_or_else(|| RiskError::NotTrained(region.to_string()))?;
        score_region(models, &self.table, region, self.cutoff)
    }

    /// Detail view; `Ok(None)` when the region is trained but has no rows.
    pub fn risk_analysis(&self, region: &str) -> RiskResult<Option<RiskAnalysis>> {
        let rows = self.timeseries(region)?;
        Ok(risk_analysis(region, &rows))
    }

    /// Inspection order over every trained region in the table.
    ///
    /// Regions without a model are skipped with a warning. Without any model
    /// set at all the ranking is `NotTrained`.
    pub fn ranking(&self) -> RiskResult<Vec<RegionRanking>> {
        if self.models.is_none() {
            return Err(RiskError::NotTrained("all regions".to_string()));
        }

        let mut entries = Vec::new();
        for region in self.regions() {
            match self.timeseries(&region) {
                Ok(rows) => entries.extend(region_ranking(&region, &rows)),
                Err(RiskError::NotTrained(_)) => {
                    warn!(region = %region, "No model for region, left out of ranking")
                }
                Err(e) => return Err(e),
            }
        }
        debug!(regions = entries.len(), "Ranking computed");
        Ok(rank_regions(entries))
    }

    pub fn model_status(&self) -> ModelStatus {
        match &self.models {
            Some(models) => ModelStatus {
                status: LoadStatus::Loaded,
                model_type: MODEL_TYPE,
                regions_available: self.regions().len(),
                trained_at: Some(models.trained_at),
                residual_thresholds: models
                    .regions
                    .iter()
                    .map(|(name, m)| (name.clone(), m.residual_threshold))
                    .collect(),
            },
            None => ModelStatus {
                status: LoadStatus::NotLoaded,
                model_type: MODEL_TYPE,
                regions_available: self.regions().len(),
                trained_at: None,
                residual_thresholds: IndexMap::new(),
            },
        }
    }

    /// Anomaly and high-risk-day counts per trained region.
    pub fn detection_summary(&self) -> RiskResult<Vec<DetectionSummary>> {
        let models = self
            .models
            .as_ref()
            .ok_or_else(|| RiskError::NotTrained("all regions".to_string()))?;

        models
            .regions
            .iter()
            .map(|(region, model)| {
                let rows = score_region(models, &self.table, region, self.cutoff)?;
                Ok(DetectionSummary {
                    region: region.clone(),
                    days: rows.len(),
                    anomalies: rows.iter().filter(|r| r.is_anomaly).count(),
                    high_risk_days: rows
                        .iter()
                        .filter(|r| is_high_risk_day(r.combined_risk_score))
                        .count(),
                    residual_threshold: model.residual_threshold,
                })
            })
            .collect()
    }
}
