//! Command implementations: context construction, training, evaluation, serving.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use aquarisk_compute::{evaluate, preprocess, ModelSet, RiskContext};
use aquarisk_core::{Config, UsageRecord};
use aquarisk_ingest::UsageCsvImporter;

use crate::live::LiveSimulator;
use crate::router::build_router;
use crate::state::AppState;

fn load_table(path: &Path) -> anyhow::Result<Vec<UsageRecord>> {
    let records = UsageCsvImporter::import(path)
        .with_context(|| format!("loading usage table from {}", path.display()))?;
    info!(path = %path.display(), rows = records.len(), "Usage table loaded");
    Ok(records)
}

/// Load the model set, degrading to "not loaded" on any failure.
pub fn load_models(path: &Path) -> Option<ModelSet> {
    match ModelSet::load(path) {
        Ok(models) => {
            info!(
                path = %path.display(),
                regions = models.len(),
                trained_at = %models.trained_at,
                "Model set loaded"
            );
            Some(models)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Model set not loaded, every region will report as untrained");
            None
        }
    }
}

/// Build the immutable query context from the configured files.
pub fn build_context(config: &Config) -> anyhow::Result<RiskContext> {
    let records = load_table(&config.data.usage_csv)?;
    let models = load_models(&config.data.model_path);
    Ok(RiskContext::from_records(&records, models, config.pipeline.deployment_cutoff))
}

pub fn train(config: &Config, csv: Option<&Path>, out: Option<&Path>) -> anyhow::Result<()> {
    let csv = csv.unwrap_or(config.data.usage_csv.as_path());
    let out = out.unwrap_or(config.data.model_path.as_path());

    let table = preprocess(&load_table(csv)?);
    let models = ModelSet::train(&table);
    if models.is_empty() {
        anyhow::bail!("no region could be trained from {}", csv.display());
    }
    models.save(out)?;

    let ctx = RiskContext::new(table, Some(models), config.pipeline.deployment_cutoff);
    for summary in ctx.detection_summary()? {
        info!(
            "{}: {} ML anomalies ({:.1}%), {} high-risk days ({:.1}%), residual threshold {:.2}",
            summary.region,
            summary.anomalies,
            summary.anomaly_pct(),
            summary.high_risk_days,
            summary.high_risk_pct(),
            summary.residual_threshold
        );
    }
    Ok(())
}

pub fn run_evaluation(config: &Config, csv: Option<&Path>, test_fraction: Option<f64>) -> anyhow::Result<()> {
    let csv = csv.unwrap_or(config.data.usage_csv.as_path());
    let fraction = test_fraction.unwrap_or(config.pipeline.eval_test_fraction);
    if !(fraction > 0.0 && fraction < 1.0) {
        anyhow::bail!("test fraction must be in (0, 1), got {fraction}");
    }

    let table = preprocess(&load_table(csv)?);
    let results = evaluate(&table, fraction);
    for r in &results {
        info!(
            "{}: MAE {:.2}, RMSE {:.2}, MAPE {}, train {} / test {}",
            r.region,
            r.mae,
            r.rmse,
            r.mape.map(|m| format!("{m:.2}%")).unwrap_or_else(|| "n/a".to_string()),
            r.train_size,
            r.test_size
        );
    }
    info!(regions = results.len(), "Evaluation complete");
    Ok(())
}

pub async fn serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let ctx = build_context(config)?;
    info!(
        regions = ctx.regions().len(),
        models_loaded = ctx.models().is_some(),
        "Risk context ready"
    );

    let state = Arc::new(AppState::new(ctx, LiveSimulator::new(config.live.seed, Utc::now())));
    let app = build_router(state, &config.server.cors_origin);

    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
