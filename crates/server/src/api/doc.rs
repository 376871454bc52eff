//! OpenAPI document, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "aquarisk API",
        version = "0.1.0",
        description = "Per-region water-consumption risk scoring and inspection ranking.",
    ),
    tags(
        (name = "Health", description = "Liveness and model load status"),
        (name = "Risk", description = "Regions, scored time series, risk detail, and ranking"),
        (name = "Live", description = "Simulated live consumption monitoring"),
    ),
    paths(
        crate::api::health::health,
        crate::api::health::model_status,
        crate::api::risk::regions,
        crate::api::risk::timeseries,
        crate::api::risk::risk,
        crate::api::risk::ranking,
        crate::api::live::live_current,
        crate::api::live::live_elevated,
    ),
    components(schemas(
        crate::api::health::HealthResponse,
        crate::api::health::ModelStatusResponse,
        crate::api::risk::TimeseriesPoint,
        crate::api::risk::RiskAnalysisResponse,
        crate::api::risk::RankingEntry,
        crate::live::LiveReading,
        crate::live::ElevatedRegion,
        aquarisk_core::RiskLevel,
        aquarisk_core::RiskTrend,
    ))
)]
pub struct ApiDoc;
