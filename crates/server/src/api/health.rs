//! Liveness and model status.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use aquarisk_compute::LoadStatus;

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub models_loaded: bool,
}

/// Liveness probe. Always 200 once the listener is up.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        models_loaded: state.risk.models().is_some(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct ModelStatusResponse {
    /// `loaded` or `not_loaded`.
    pub status: &'static str,
    pub model_type: &'static str,
    pub regions_available: usize,
    pub trained_at: Option<DateTime<Utc>>,
    /// Adaptive residual threshold per trained region.
    pub residual_thresholds: BTreeMap<String, f64>,
}

/// Whether a model set was loaded at startup, and what it covers.
#[utoipa::path(
    get,
    path = "/models/status",
    tag = "Health",
    responses(
        (status = 200, description = "Model load status", body = ModelStatusResponse)
    )
)]
pub async fn model_status(State(state): State<Arc<AppState>>) -> Json<ModelStatusResponse> {
    let status = state.risk.model_status();
    Json(ModelStatusResponse {
        status: match status.status {
            LoadStatus::Loaded => "loaded",
            LoadStatus::NotLoaded => "not_loaded",
        },
        model_type: status.model_type,
        regions_available: status.regions_available,
        trained_at: status.trained_at,
        residual_thresholds: status
            .residual_thresholds
            .into_iter()
            .map(|(region, t)| (region, super::round2(t)))
            .collect(),
    })
}
