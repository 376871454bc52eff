use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::live::{ElevatedRegion, LiveReading};
use crate::state::AppState;

/// Advance the simulator to now and return one reading per region.
#[utoipa::path(
    get,
    path = "/live/current",
    tag = "Live",
    responses(
        (status = 200, description = "Current simulated readings", body = Vec<LiveReading>)
    )
)]
pub async fn live_current(State(state): State<Arc<AppState>>) -> Json<Vec<LiveReading>> {
    let mut sim = state.live.lock().await;
    Json(sim.advance(Utc::now()))
}

/// Regions currently inside an elevated-consumption episode.
#[utoipa::path(
    get,
    path = "/live/elevated",
    tag = "Live",
    responses(
        (status = 200, description = "Active elevated episodes", body = Vec<ElevatedRegion>)
    )
)]
pub async fn live_elevated(State(state): State<Arc<AppState>>) -> Json<Vec<ElevatedRegion>> {
    let sim = state.live.lock().await;
    Json(sim.elevated())
}
