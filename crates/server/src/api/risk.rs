//! Region listing, scored time series, risk detail, and the inspection ranking.
//!
//! Unknown or untrained regions fail soft: `[]` for lists, `{}` for the detail
//! view. Scoring is CPU-bound and runs on the blocking pool.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use aquarisk_compute::RiskContext;
use aquarisk_core::{RiskError, RiskLevel, RiskResult, RiskTrend};

use super::round2;
use crate::state::AppState;

fn log_soft_failure(region: &str, err: &RiskError) {
    match err {
        RiskError::NotTrained(_) => debug!(region, "Region not trained, returning empty result"),
        other => warn!(region, error = %other, "Scoring failed, returning empty result"),
    }
}

/// Run `query` against the risk context on the blocking pool.
///
/// Any failure, including a panicked or cancelled task, is logged and
/// collapses to `None`.
async fn score_off_runtime<T, F>(state: &AppState, region: &str, query: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce(&RiskContext) -> RiskResult<T> + Send + 'static,
{
    let risk = Arc::clone(&state.risk);
    match tokio::task::spawn_blocking(move || query(&risk)).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            log_soft_failure(region, &e);
            None
        }
        Err(e) => {
            warn!(region, error = %e, "Scoring task did not complete, returning empty result");
            None
        }
    }
}

/// Sorted names of every region in the usage table.
#[utoipa::path(
    get,
    path = "/regions",
    tag = "Risk",
    responses(
        (status = 200, description = "Region names", body = Vec<String>)
    )
)]
pub async fn regions(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.risk.regions())
}

#[derive(Serialize, ToSchema)]
pub struct TimeseriesPoint {
    pub date: NaiveDate,
    pub actual_usage: f64,
    pub predicted_usage: f64,
    pub risk_score: f64,
    pub is_anomaly: bool,
}

/// Daily actual vs. predicted usage with the smoothed risk score.
#[utoipa::path(
    get,
    path = "/timeseries/{region}",
    tag = "Risk",
    params(("region" = String, Path, description = "Region name")),
    responses(
        (status = 200, description = "Scored series, empty for unknown regions", body = Vec<TimeseriesPoint>)
    )
)]
pub async fn timeseries(
    State(state): State<Arc<AppState>>,
    Path(region): Path<String>,
) -> Json<Vec<TimeseriesPoint>> {
    let name = region.clone();
    let Some(rows) = score_off_runtime(&state, &region, move |risk| risk.timeseries(&name)).await else {
        return Json(Vec::new());
    };

    Json(
        rows.into_iter()
            .map(|r| TimeseriesPoint {
                date: r.date,
                actual_usage: round2(r.actual_usage),
                predicted_usage: round2(r.predicted_usage),
                risk_score: round2(r.combined_risk_score),
                is_anomaly: r.is_anomaly,
            })
            .collect(),
    )
}

#[derive(Serialize, ToSchema)]
pub struct RiskAnalysisResponse {
    pub region: String,
    pub current_risk_score: f64,
    pub recent_peak_risk: f64,
    pub average_risk_7d: f64,
    pub recent_anomalies_30d: usize,
    pub risk_trend: RiskTrend,
    pub last_updated: NaiveDate,
}

/// Recent risk summary for one region.
#[utoipa::path(
    get,
    path = "/risk/{region}",
    tag = "Risk",
    params(("region" = String, Path, description = "Region name")),
    responses(
        (status = 200, description = "Risk detail, `{}` for unknown regions", body = RiskAnalysisResponse)
    )
)]
pub async fn risk(State(state): State<Arc<AppState>>, Path(region): Path<String>) -> Response {
    let name = region.clone();
    let Some(analysis) = score_off_runtime(&state, &region, move |risk| risk.risk_analysis(&name))
        .await
        .flatten()
    else {
        return Json(serde_json::json!({})).into_response();
    };

    Json(RiskAnalysisResponse {
        region: analysis.region,
        current_risk_score: round2(analysis.current_risk_score),
        recent_peak_risk: round2(analysis.recent_peak_risk),
        average_risk_7d: round2(analysis.average_risk_7d),
        recent_anomalies_30d: analysis.recent_anomalies_30d,
        risk_trend: analysis.risk_trend,
        last_updated: analysis.last_updated,
    })
    .into_response()
}

#[derive(Serialize, ToSchema)]
pub struct RankingEntry {
    pub region: String,
    pub current_risk: f64,
    pub recent_peak_risk: f64,
    pub risk_level: RiskLevel,
    pub persistence_days: u8,
    pub priority_score: f64,
    pub inspection_priority: usize,
}

/// Regions ordered by inspection priority, highest first.
#[utoipa::path(
    get,
    path = "/ranking",
    tag = "Risk",
    responses(
        (status = 200, description = "Inspection ranking, empty when no models are loaded", body = Vec<RankingEntry>)
    )
)]
pub async fn ranking(State(state): State<Arc<AppState>>) -> Json<Vec<RankingEntry>> {
    let Some(ranked) = score_off_runtime(&state, "*", RiskContext::ranking).await else {
        return Json(Vec::new());
    };

    Json(
        ranked
            .into_iter()
            .map(|r| RankingEntry {
                region: r.region,
                current_risk: round2(r.current_risk),
                recent_peak_risk: round2(r.recent_peak_risk),
                risk_level: r.risk_level,
                persistence_days: r.persistence_days,
                priority_score: round2(r.priority_score),
                inspection_priority: r.inspection_priority,
            })
            .collect(),
    )
}
