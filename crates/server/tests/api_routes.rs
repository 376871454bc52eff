//! Router-level tests: requests go through the full axum stack via `oneshot`.

use std::sync::Arc;

use aquarisk_compute::{preprocess, ModelSet, RiskContext};
use aquarisk_core::UsageRecord;
use aquarisk_server::live::LiveSimulator;
use aquarisk_server::{build_router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

fn records() -> Vec<UsageRecord> {
    let start = NaiveDate::from_ymd_opt(2022, 10, 1).unwrap();
    let mut records = Vec::new();
    for d in 0..90 {
        let date = start + Duration::days(d);
        let weekly = if d % 7 >= 5 { 0.9 } else { 1.05 };
        let wobble = 1.0 + 0.02 * ((d * 37 % 11) as f64 - 5.0) / 5.0;
        records.push(UsageRecord::new("South", date, 8000.0 * weekly * wobble));
        records.push(UsageRecord::new("North", date, 12000.0 * weekly / wobble));
    }
    records
}

fn live() -> LiveSimulator {
    LiveSimulator::new(Some(5), Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap())
}

fn trained_app() -> Router {
    let table = preprocess(&records());
    let models = ModelSet::train(&table);
    let ctx = RiskContext::new(table, Some(models), NaiveDate::from_ymd_opt(2022, 12, 1));
    build_router(Arc::new(AppState::new(ctx, live())), "*")
}

fn untrained_app() -> Router {
    let ctx = RiskContext::from_records(&records(), None, None);
    build_router(Arc::new(AppState::new(ctx, live())), "*")
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn has_two_decimals_at_most(v: &Value) -> bool {
    let x = v.as_f64().unwrap();
    ((x * 100.0).round() - x * 100.0).abs() < 1e-6
}

#[tokio::test]
async fn health_reports_model_state() {
    let (status, json) = get_json(trained_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["models_loaded"], true);

    let (_, json) = get_json(untrained_app(), "/health").await;
    assert_eq!(json["models_loaded"], false);
}

#[tokio::test]
async fn regions_are_sorted() {
    let (status, json) = get_json(trained_app(), "/regions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!(["North", "South"]));
}

#[tokio::test]
async fn timeseries_is_rounded_and_complete() {
    let (status, json) = get_json(trained_app(), "/timeseries/North").await;
    assert_eq!(status, StatusCode::OK);
    let points = json.as_array().unwrap();
    assert_eq!(points.len(), 90);

    let first = &points[0];
    assert_eq!(first["date"], "2022-10-01");
    for key in ["actual_usage", "predicted_usage", "risk_score"] {
        assert!(has_two_decimals_at_most(&first[key]), "{key} not rounded");
    }
    assert!(first["is_anomaly"].is_boolean());
    for p in points {
        let score = p["risk_score"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&score));
    }
}

#[tokio::test]
async fn unknown_region_fails_soft() {
    let (status, json) = get_json(trained_app(), "/timeseries/Atlantis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));

    let (status, json) = get_json(trained_app(), "/risk/Atlantis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({}));
}

#[tokio::test]
async fn risk_detail_fields() {
    let (_, json) = get_json(trained_app(), "/risk/South").await;
    assert_eq!(json["region"], "South");
    assert_eq!(json["last_updated"], "2022-12-29");
    let trend = json["risk_trend"].as_str().unwrap();
    assert!(trend == "increasing" || trend == "decreasing");
    assert!(json["recent_anomalies_30d"].as_u64().unwrap() <= 30);
    assert!(has_two_decimals_at_most(&json["average_risk_7d"]));
}

#[tokio::test]
async fn ranking_orders_every_trained_region() {
    let (status, json) = get_json(trained_app(), "/ranking").await;
    assert_eq!(status, StatusCode::OK);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["inspection_priority"], 1);
    assert_eq!(entries[1]["inspection_priority"], 2);
    assert!(entries[0]["priority_score"].as_f64() >= entries[1]["priority_score"].as_f64());
    for e in entries {
        let level = e["risk_level"].as_str().unwrap();
        assert!(["Low", "Medium", "High"].contains(&level));
        assert!(e["persistence_days"].as_u64().unwrap() <= 7);
    }
}

#[tokio::test(flavor = "current_thread")]
async fn ranking_is_scored_off_the_request_thread() {
    let app = trained_app();
    let pending = tokio::spawn(get_json(app, "/ranking"));

    // One yield lets the request start. With scoring on the blocking pool the
    // single runtime thread is handed back before the ranking is done.
    tokio::task::yield_now().await;
    assert!(!pending.is_finished());

    let (status, json) = pending.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn without_models_everything_is_empty() {
    let (_, json) = get_json(untrained_app(), "/ranking").await;
    assert_eq!(json, serde_json::json!([]));
    let (_, json) = get_json(untrained_app(), "/timeseries/North").await;
    assert_eq!(json, serde_json::json!([]));

    let (_, json) = get_json(untrained_app(), "/models/status").await;
    assert_eq!(json["status"], "not_loaded");
    assert_eq!(json["regions_available"], 2);
}

#[tokio::test]
async fn model_status_lists_thresholds() {
    let (_, json) = get_json(trained_app(), "/models/status").await;
    assert_eq!(json["status"], "loaded");
    assert!(json["trained_at"].is_string());
    assert!(json["residual_thresholds"]["North"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn live_endpoints() {
    let (status, json) = get_json(trained_app(), "/live/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 5);

    let (_, json) = get_json(trained_app(), "/live/elevated").await;
    let elevated = json.as_array().unwrap();
    assert_eq!(elevated.len(), 2);
    assert_eq!(elevated[0]["region"], "East");
    assert_eq!(elevated[0]["kind"], "persistent");
    assert_eq!(elevated[1]["pattern"], "increasing");
}

#[tokio::test]
async fn docs_are_served() {
    let response = trained_app()
        .oneshot(Request::builder().uri("/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
