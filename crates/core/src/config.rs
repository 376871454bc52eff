use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Default deployment cutoff used when `DEPLOYMENT_CUTOFF` is unset.
pub const DEFAULT_DEPLOYMENT_CUTOFF: &str = "2023-01-25";

/// Parse a cutoff value. Empty, `none`, and `off` disable the cutoff;
/// anything unparseable is treated the same way and logged.
pub fn parse_cutoff(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") || trimmed.eq_ignore_ascii_case("off") {
        return None;
    }
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(value = trimmed, error = %e, "ignoring unparseable DEPLOYMENT_CUTOFF");
            None
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub data: DataConfig,
    pub pipeline: PipelineConfig,
    pub live: LiveConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `AQUARISK_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("AQUARISK_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            data: DataConfig::from_env_profiled(p),
            pipeline: PipelineConfig::from_env_profiled(p),
            live: LiveConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{} cors={}", self.server.host, self.server.port, self.server.cors_origin);
        tracing::info!("  data:        usage_csv={}", self.data.usage_csv.display());
        tracing::info!("  models:      model_path={}", self.data.model_path.display());
        tracing::info!(
            "  pipeline:    deployment_cutoff={}, eval_test_fraction={}",
            self.pipeline
                .deployment_cutoff
                .map(|d| d.to_string())
                .unwrap_or_else(|| "(none)".to_string()),
            self.pipeline.eval_test_fraction
        );
        tracing::info!(
            "  live:        seed={}",
            self.live.seed.map(|s| s.to_string()).unwrap_or_else(|| "(entropy)".to_string())
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Data files ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV with `region,date,daily_usage` columns.
    pub usage_csv: PathBuf,
    /// Serialized model set written by `train`.
    pub model_path: PathBuf,
}

impl DataConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            usage_csv: PathBuf::from(profiled_env_or(p, "USAGE_CSV", "data/water_consumption_cleaned.csv")),
            model_path: PathBuf::from(profiled_env_or(p, "MODEL_PATH", "models/aquarisk_model.msgpack")),
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Usage after this date is hidden from the forecaster.
    pub deployment_cutoff: Option<NaiveDate>,
    /// Trailing share of each region's history held out by `evaluate`.
    pub eval_test_fraction: f64,
}

impl PipelineConfig {
    fn from_env_profiled(p: &str) -> Self {
        let fraction = profiled_env_f64(p, "EVAL_TEST_FRACTION", 0.2);
        Self {
            deployment_cutoff: parse_cutoff(&profiled_env_or(p, "DEPLOYMENT_CUTOFF", DEFAULT_DEPLOYMENT_CUTOFF)),
            eval_test_fraction: if fraction > 0.0 && fraction < 1.0 { fraction } else { 0.2 },
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deployment_cutoff: parse_cutoff(DEFAULT_DEPLOYMENT_CUTOFF),
            eval_test_fraction: 0.2,
        }
    }
}

// ── Live simulator ────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Fixed RNG seed for reproducible demos; entropy when unset.
    pub seed: Option<u64>,
}

impl LiveConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            seed: profiled_env_opt(p, "LIVE_SEED").and_then(|v| v.parse().ok()),
        }
    }
}
