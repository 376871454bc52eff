//! Per-region usage forecaster on top of augurs' Prophet.
//!
//! Piecewise-linear trend with weekly and yearly Fourier seasonality plus an
//! `is_weekend` regressor, all multiplicative:
//!
//! ```text
//! y(t) = g(t) · (1 + s(t) + β · is_weekend)
//! ```
//!
//! The MAP fit runs through Prophet's Stan model compiled to WebAssembly
//! ([`WasmstanOptimizer`]). Prophet's defaults already carry the trend and
//! seasonality priors we want (25 changepoints over the first 80% of the
//! history, changepoint prior 0.05, seasonality prior 10).
//!
//! A fitted Prophet cannot be serialized, so the forecaster persists the
//! history it was fitted on and refits once on first use after a load.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use augurs::prophet::wasmstan::WasmstanOptimizer;
use augurs::prophet::{
    FeatureMode, PredictionData, Prophet, ProphetOptions, Regressor, SeasonalityOption, TrainingData,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aquarisk_core::{RiskError, RiskResult};

const WEEKEND_REGRESSOR: &str = "is_weekend";
const SECONDS_PER_DAY: i64 = 86_400;

/// Forecaster hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalConfig {
    /// Yearly seasonality is only fitted once the history covers this many
    /// days. Shorter histories cannot pin down a yearly cycle and the Fourier
    /// terms would take over out-of-sample forecasts.
    pub yearly_min_history_days: i64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            yearly_min_history_days: 365,
        }
    }
}

/// One day handed to the forecaster.
///
/// `usage` is `None` for days whose actuals are withheld; such days are
/// skipped when fitting and never consulted when predicting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastInput {
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub usage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Observation {
    /// Seconds since the Unix epoch at midnight UTC.
    ds: i64,
    y: f64,
    is_weekend: bool,
}

/// Fitted Prophet handle, rebuilt on demand after deserialization.
#[derive(Default)]
struct FittedProphet(Mutex<Option<Prophet<WasmstanOptimizer>>>);

impl Clone for FittedProphet {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl fmt::Debug for FittedProphet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fitted = self.0.lock().map(|p| p.is_some()).unwrap_or(false);
        f.debug_struct("FittedProphet").field("fitted", &fitted).finish()
    }
}

/// A fitted per-region forecaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalForecaster {
    config: SeasonalConfig,
    history: Vec<Observation>,
    /// Set when every observed day had the same usage.
    flat_level: Option<f64>,
    #[serde(skip)]
    fitted: FittedProphet,
}

impl SeasonalForecaster {
    /// Fit with default hyper-parameters.
    pub fn fit(history: &[ForecastInput]) -> RiskResult<Self> {
        Self::fit_with_config(history, SeasonalConfig::default())
    }

    pub fn fit_with_config(history: &[ForecastInput], config: SeasonalConfig) -> RiskResult<Self> {
        let mut observed: Vec<Observation> = history
            .iter()
            .filter_map(|p| {
                p.usage.filter(|u| u.is_finite()).map(|y| Observation {
                    ds: epoch_seconds(p.date),
                    y,
                    is_weekend: p.is_weekend,
                })
            })
            .collect();
        if observed.len() < 2 {
            return Err(RiskError::InvalidInput(format!(
                "forecaster needs at least two observed days, got {}",
                observed.len()
            )));
        }
        observed.sort_by_key(|o| o.ds);

        let (lo, hi) = observed
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| (lo.min(o.y), hi.max(o.y)));
        if lo == hi {
            return Ok(Self {
                config,
                history: observed,
                flat_level: Some(lo),
                fitted: FittedProphet::default(),
            });
        }

        let prophet = fit_prophet(&config, &observed)?;
        Ok(Self {
            config,
            history: observed,
            flat_level: None,
            fitted: FittedProphet(Mutex::new(Some(prophet))),
        })
    }

    /// Expected usage for each input day, in input order.
    pub fn predict(&self, inputs: &[ForecastInput]) -> RiskResult<Vec<f64>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(level) = self.flat_level {
            return Ok(vec![level; inputs.len()]);
        }

        let mut fitted = self.fitted.0.lock().unwrap_or_else(PoisonError::into_inner);
        if fitted.is_none() {
            debug!(observations = self.history.len(), "Refitting forecaster after load");
            *fitted = Some(fit_prophet(&self.config, &self.history)?);
        }
        let Some(prophet) = fitted.as_ref() else {
            return Err(RiskError::InvalidInput("forecaster has no fitted model".to_string()));
        };

        let ds = inputs.iter().map(|p| epoch_seconds(p.date)).collect();
        let weekend = inputs.iter().map(|p| weekend_flag(p.is_weekend)).collect();
        let data = PredictionData::new(ds)
            .with_regressors(HashMap::from([(WEEKEND_REGRESSOR.to_string(), weekend)]))
            .map_err(forecast_error)?;
        let predictions = prophet.predict(data).map_err(forecast_error)?;
        Ok(predictions.yhat.point)
    }

    /// Whether the history was long enough to fit a yearly cycle.
    pub fn models_yearly_cycle(&self) -> bool {
        self.flat_level.is_none() && fits_yearly(&self.config, &self.history)
    }
}

fn fit_prophet(config: &SeasonalConfig, history: &[Observation]) -> RiskResult<Prophet<WasmstanOptimizer>> {
    let options = ProphetOptions {
        seasonality_mode: FeatureMode::Multiplicative,
        yearly_seasonality: SeasonalityOption::Manual(fits_yearly(config, history)),
        weekly_seasonality: SeasonalityOption::Manual(true),
        daily_seasonality: SeasonalityOption::Manual(false),
        uncertainty_samples: 0,
        ..Default::default()
    };

    let ds = history.iter().map(|o| o.ds).collect();
    let y = history.iter().map(|o| o.y).collect();
    let weekend = history.iter().map(|o| weekend_flag(o.is_weekend)).collect();
    let data = TrainingData::new(ds, y)
        .map_err(forecast_error)?
        .with_regressors(HashMap::from([(WEEKEND_REGRESSOR.to_string(), weekend)]))
        .map_err(forecast_error)?;

    let mut prophet = Prophet::new(options, WasmstanOptimizer::new());
    prophet.add_regressor(WEEKEND_REGRESSOR.to_string(), Regressor::multiplicative());
    prophet.fit(data, Default::default()).map_err(forecast_error)?;
    Ok(prophet)
}

fn fits_yearly(config: &SeasonalConfig, history: &[Observation]) -> bool {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) => (last.ds - first.ds) / SECONDS_PER_DAY >= config.yearly_min_history_days,
        _ => false,
    }
}

fn epoch_seconds(date: NaiveDate) -> i64 {
    (date - NaiveDate::default()).num_days() * SECONDS_PER_DAY
}

fn weekend_flag(is_weekend: bool) -> f64 {
    if is_weekend {
        1.0
    } else {
        0.0
    }
}

fn forecast_error(e: impl fmt::Display) -> RiskError {
    RiskError::InvalidInput(format!("forecast failed: {e}"))
}
