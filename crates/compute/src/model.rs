//! Per-region trained models and their on-disk form.
//!
//! A [`ModelSet`] maps region names to [`RegionModel`]s. It is written once by
//! the `train` command as a MessagePack blob and loaded read-only at startup.

use std::fs;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use aquarisk_core::{FeatureRow, RiskError, RiskResult};

use crate::algorithms::isolation_forest::ForestConfig;
use crate::algorithms::seasonal::SeasonalForecaster;
use crate::pipeline::anomaly::AnomalyDetector;
use crate::pipeline::features::{region_rows, regions};
use crate::pipeline::risk::mask_after_cutoff;
use crate::stats::percentile;

/// Bumped whenever the serialized layout of [`ModelSet`] changes.
pub const MODEL_FORMAT_VERSION: u32 = 2;

/// Threshold used when no in-sample residual is available.
pub const FALLBACK_RESIDUAL_THRESHOLD: f64 = 1000.0;

pub const MODEL_TYPE: &str = "Prophet+IsolationForest";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionModel {
    pub forecaster: SeasonalForecaster,
    pub anomaly_detector: AnomalyDetector,
    /// Upper Tukey fence of in-sample absolute residuals.
    pub residual_threshold: f64,
}

/// `q75 + 1.5·IQR` of the finite residual magnitudes.
pub fn adaptive_threshold(abs_residuals: &[f64]) -> f64 {
    let finite: Vec<f64> = abs_residuals.iter().copied().filter(|r| r.is_finite()).collect();
    match (percentile(&finite, 0.25), percentile(&finite, 0.75)) {
        (Some(q25), Some(q75)) => q75 + 1.5 * (q75 - q25),
        _ => FALLBACK_RESIDUAL_THRESHOLD,
    }
}

/// Fit the forecaster and anomaly detector for one region's rows.
pub fn train_region(region: &str, rows: &[FeatureRow]) -> RiskResult<RegionModel> {
    if rows.is_empty() {
        return Err(RiskError::InvalidInput(format!("no usage rows for region {region}")));
    }
    let history = mask_after_cutoff(rows, None);
    let forecaster = SeasonalForecaster::fit(&history)?;
    let anomaly_detector = AnomalyDetector::fit(rows, &ForestConfig::default())?;

    let abs_residuals: Vec<f64> = rows
        .iter()
        .zip(forecaster.predict(&history)?)
        .map(|(row, predicted)| (row.daily_usage - predicted).abs())
        .collect();

    Ok(RegionModel {
        forecaster,
        anomaly_detector,
        residual_threshold: adaptive_threshold(&abs_residuals),
    })
}

/// Versioned collection of region models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSet {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub regions: IndexMap<String, RegionModel>,
}

impl ModelSet {
    pub fn new(regions: IndexMap<String, RegionModel>) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            trained_at: Utc::now(),
            regions,
        }
    }

    /// Train every region of a preprocessed table in parallel.
    ///
    /// Regions that cannot be fitted are logged and left out; the rest keep
    /// table order.
    pub fn train(table: &[FeatureRow]) -> Self {
        let start = Instant::now();
        let names = regions(table);
        info!(regions = names.len(), rows = table.len(), "Training region models");

        let fitted: Vec<(String, RiskResult<RegionModel>)> = names
            .into_par_iter()
            .map(|region| {
                let t = Instant::now();
                let result = train_region(&region, region_rows(table, &region));
                if let Ok(model) = &result {
                    info!(
                        region = %region,
                        threshold = model.residual_threshold,
                        elapsed_ms = t.elapsed().as_millis() as u64,
                        "Region model trained"
                    );
                }
                (region, result)
            })
            .collect();

        let mut models = IndexMap::new();
        for (region, result) in fitted {
            match result {
                Ok(model) => {
                    models.insert(region, model);
                }
                Err(e) => warn!(region = %region, error = %e, "Skipping region"),
            }
        }

        info!(
            trained = models.len(),
            elapsed_s = start.elapsed().as_secs_f64(),
            "Training complete"
        );
        Self::new(models)
    }

    /// Model for `region`, or `NotTrained`.
    pub fn get(&self, region: &str) -> RiskResult<&RegionModel> {
        self.regions
            .get(region)
            .ok_or_else(|| RiskError::NotTrained(region.to_string()))
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn to_bytes(&self) -> RiskResult<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| RiskError::Serialize(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> RiskResult<Self> {
        let set: Self = rmp_serde::from_slice(bytes).map_err(|e| RiskError::ModelLoad(e.to_string()))?;
        if set.format_version != MODEL_FORMAT_VERSION {
            return Err(RiskError::ModelLoad(format!(
                "unsupported model format version {} (expected {})",
                set.format_version, MODEL_FORMAT_VERSION
            )));
        }
        Ok(set)
    }

    pub fn save(&self, path: &Path) -> RiskResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes()?)?;
        info!(path = %path.display(), regions = self.len(), "Model set saved");
        Ok(())
    }

    pub fn load(path: &Path) -> RiskResult<Self> {
        let bytes = fs::read(path)
            .map_err(|e| RiskError::ModelLoad(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&bytes)
    }
}
