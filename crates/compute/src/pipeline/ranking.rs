use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use aquarisk_core::{RiskLevel, RiskTrend};

use super::risk::RiskRow;
use crate::stats::{mean, percentile, tail};

/// Rows considered for the recent peak.
pub const PEAK_WINDOW: usize = 14;
/// Quantile of the trailing window used as the recent peak.
pub const PEAK_QUANTILE: f64 = 0.9;
/// Score at or above which a day counts towards persistence.
pub const PERSISTENCE_SCORE: f64 = 50.0;
/// Trailing rows in the persistence indicator window.
pub const PERSISTENCE_WINDOW: usize = 3;
pub const TREND_WINDOW: usize = 7;
pub const ANOMALY_LOOKBACK: usize = 30;

/// A region's place in the inspection list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRanking {
    pub region: String,
    pub current_risk: f64,
    pub recent_peak_risk: f64,
    pub risk_level: RiskLevel,
    /// 0..=7
    pub persistence_days: u8,
    pub priority_score: f64,
    /// 1-based; 0 until [`rank_regions`] assigns it.
    pub inspection_priority: usize,
}

/// Detail view of one region's recent risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub region: String,
    pub current_risk_score: f64,
    pub recent_peak_risk: f64,
    pub average_risk_7d: f64,
    pub recent_anomalies_30d: usize,
    pub risk_trend: RiskTrend,
    pub last_updated: NaiveDate,
}

/// 90th percentile of the last 14 scores.
pub fn recent_peak(scores: &[f64]) -> Option<f64> {
    percentile(tail(scores, PEAK_WINDOW), PEAK_QUANTILE)
}

/// `round(7 × share of the last three scores ≥ 50)`; 0 without three scores.
pub fn persistence_days(scores: &[f64]) -> u8 {
    if scores.len() < PERSISTENCE_WINDOW {
        return 0;
    }
    let hits = tail(scores, PERSISTENCE_WINDOW)
        .iter()
        .filter(|s| **s >= PERSISTENCE_SCORE)
        .count();
    (7.0 * hits as f64 / PERSISTENCE_WINDOW as f64).round() as u8
}

pub fn priority_score(recent_peak: f64, persistence_days: u8, current_risk: f64) -> f64 {
    let persistence_scaled = persistence_days.min(7) as f64 / 7.0 * 100.0;
    0.5 * recent_peak + 0.3 * persistence_scaled + 0.2 * current_risk
}

/// Compare the mean of the last week with the week before it.
///
/// The "week before" is the head of the last 14 rows, so with fewer than 14
/// rows the two windows overlap.
pub fn risk_trend(scores: &[f64]) -> RiskTrend {
    let last = mean(tail(scores, TREND_WINDOW));
    let window = tail(scores, 2 * TREND_WINDOW);
    let prev = mean(&window[..window.len().min(TREND_WINDOW)]);
    match (last, prev) {
        (Some(l), Some(p)) if l > p => RiskTrend::Increasing,
        _ => RiskTrend::Decreasing,
    }
}

/// Ranking entry for a scored region; `None` for an empty series.
pub fn region_ranking(region: &str, rows: &[RiskRow]) -> Option<RegionRanking> {
    let scores = combined_scores(rows);
    let current_risk = *scores.last()?;
    let recent_peak_risk = recent_peak(&scores)?;
    let persistence = persistence_days(&scores);
    Some(RegionRanking {
        region: region.to_string(),
        current_risk,
        recent_peak_risk,
        risk_level: RiskLevel::from_peak(recent_peak_risk),
        persistence_days: persistence,
        priority_score: priority_score(recent_peak_risk, persistence, current_risk),
        inspection_priority: 0,
    })
}

/// Sort by priority descending, keeping input order among ties, and number
/// the result from 1.
pub fn rank_regions(mut entries: Vec<RegionRanking>) -> Vec<RegionRanking> {
    entries.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.inspection_priority = i + 1;
    }
    entries
}

/// Detail view for a scored region; `None` for an empty series.
pub fn risk_analysis(region: &str, rows: &[RiskRow]) -> Option<RiskAnalysis> {
    let scores = combined_scores(rows);
    let last = rows.last()?;
    let recent_anomalies_30d = rows[rows.len().saturating_sub(ANOMALY_LOOKBACK)..]
        .iter()
        .filter(|r| r.is_anomaly)
        .count();
    Some(RiskAnalysis {
        region: region.to_string(),
        current_risk_score: last.combined_risk_score,
        recent_peak_risk: recent_peak(&scores)?,
        average_risk_7d: mean(tail(&scores, TREND_WINDOW))?,
        recent_anomalies_30d,
        risk_trend: risk_trend(&scores),
        last_updated: last.date,
    })
}

fn combined_scores(rows: &[RiskRow]) -> Vec<f64> {
    rows.iter().map(|r| r.combined_risk_score).collect()
}
