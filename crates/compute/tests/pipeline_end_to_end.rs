//! Train, score, rank, and persist against synthetic regional tables.

use aquarisk_compute::{inject_leak, preprocess, ModelSet, RiskContext};
use aquarisk_core::{RiskError, RiskLevel, UsageRecord};
use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DAYS: i64 = 240;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 9, 1).unwrap()
}

/// Weekly-seasonal usage with ±3% seeded noise for each region.
fn seasonal_table(regions: &[(&str, f64)]) -> Vec<UsageRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    let mut records = Vec::new();
    for (region, base) in regions {
        for d in 0..DAYS {
            let date = start() + Duration::days(d);
            let weekly = if d % 7 >= 5 { 0.9 } else { 1.05 };
            let noise = rng.gen_range(0.97..1.03);
            records.push(UsageRecord::new(*region, date, base * weekly * noise));
        }
    }
    records
}

fn constant_table() -> Vec<UsageRecord> {
    ["North", "South"]
        .iter()
        .flat_map(|region| {
            (0..120).map(move |d| UsageRecord::new(*region, start() + Duration::days(d), 1000.0))
        })
        .collect()
}

#[test]
fn scores_stay_bounded_for_every_region() {
    let records = seasonal_table(&[("North", 12000.0), ("South", 8000.0), ("East", 15000.0)]);
    let table = preprocess(&records);
    let models = ModelSet::train(&table);
    assert_eq!(models.len(), 3);

    let ctx = RiskContext::new(table, Some(models), NaiveDate::from_ymd_opt(2023, 1, 25));
    for region in ctx.regions() {
        let rows = ctx.timeseries(&region).unwrap();
        assert_eq!(rows.len(), DAYS as usize);
        for row in &rows {
            assert!((0.0..=100.0).contains(&row.combined_risk_score));
            assert!((0.0..=1.0).contains(&row.residual_severity));
            assert!((0.0..=1.0).contains(&row.anomaly_severity));
            assert!((row.residual - (row.actual_usage - row.predicted_usage)).abs() < 1e-9);
        }
        // Forecast stays in the right ballpark after the cutoff too.
        let last = rows.last().unwrap();
        assert!((last.predicted_usage / last.actual_usage - 1.0).abs() < 0.25);
    }
}

#[test]
fn constant_usage_is_low_risk_without_anomalies() {
    let table = preprocess(&constant_table());
    let ctx = RiskContext::new(table.clone(), Some(ModelSet::train(&table)), None);

    let rows = ctx.timeseries("North").unwrap();
    assert!(rows.iter().all(|r| r.abs_residual < 1e-3));
    assert!(rows.iter().all(|r| !r.is_anomaly));
    assert!(rows.iter().all(|r| r.combined_risk_score == 0.0));

    let ranking = ctx.ranking().unwrap();
    assert_eq!(ranking.len(), 2);
    assert!(ranking.iter().all(|r| r.risk_level == RiskLevel::Low));
    // Ties keep region order.
    assert_eq!(ranking[0].region, "North");
    assert_eq!(ranking[1].region, "South");
}

#[test]
fn leaking_region_tops_the_ranking() {
    let clean = seasonal_table(&[
        ("North", 12000.0),
        ("South", 8000.0),
        ("East", 15000.0),
        ("West", 13000.0),
    ]);
    let leak_start = start() + Duration::days(DAYS - 20);
    let leaked = inject_leak(&clean, "East", leak_start, 0.5, 0.1, 99);

    let models = ModelSet::train(&preprocess(&clean));
    let ctx = RiskContext::from_records(&leaked, Some(models), Some(leak_start - Duration::days(1)));

    let ranking = ctx.ranking().unwrap();
    assert_eq!(ranking.len(), 4);
    assert_eq!(ranking[0].region, "East");
    assert_eq!(ranking[0].inspection_priority, 1);
    assert_eq!(ranking[0].risk_level, RiskLevel::High);
    assert!(ranking.windows(2).all(|w| w[0].priority_score >= w[1].priority_score));

    let analysis = ctx.risk_analysis("East").unwrap().unwrap();
    assert!(analysis.recent_anomalies_30d > 0);
    assert_eq!(analysis.last_updated, start() + Duration::days(DAYS - 1));
}

#[test]
fn unknown_region_fails_before_scoring() {
    let table = preprocess(&constant_table());
    let ctx = RiskContext::new(table.clone(), Some(ModelSet::train(&table)), None);
    assert!(matches!(ctx.timeseries("Atlantis"), Err(RiskError::NotTrained(r)) if r == "Atlantis"));
    assert!(matches!(ctx.risk_analysis("Atlantis"), Err(RiskError::NotTrained(_))));
}

#[test]
fn saved_models_score_identically_after_reload() {
    let records = seasonal_table(&[("Central", 14000.0), ("West", 13000.0)]);
    let table = preprocess(&records);
    let models = ModelSet::train(&table);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("aquarisk_model.msgpack");
    models.save(&path).unwrap();
    let reloaded = ModelSet::load(&path).unwrap();
    assert_eq!(reloaded.trained_at, models.trained_at);
    assert_eq!(reloaded.region_names().collect::<Vec<_>>(), vec!["Central", "West"]);

    // The reloaded forecaster refits from its stored history.
    let before = RiskContext::new(table.clone(), Some(models), None).timeseries("West").unwrap();
    let after = RiskContext::new(table, Some(reloaded), None).timeseries("West").unwrap();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.date, a.date);
        assert!((b.predicted_usage - a.predicted_usage).abs() < 1e-6 * b.predicted_usage.abs().max(1.0));
        assert!((b.combined_risk_score - a.combined_risk_score).abs() < 1e-6);
        assert_eq!(b.is_anomaly, a.is_anomaly);
    }
}

#[test]
fn missing_model_file_is_a_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let err = ModelSet::load(&dir.path().join("absent.msgpack")).unwrap_err();
    assert!(matches!(err, RiskError::ModelLoad(_)));
}

#[test]
fn detection_summary_counts_every_day() {
    let records = seasonal_table(&[("North", 12000.0)]);
    let table = preprocess(&records);
    let ctx = RiskContext::new(table.clone(), Some(ModelSet::train(&table)), None);

    let summary = ctx.detection_summary().unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].days, DAYS as usize);
    // Top 5% of the scored batch is flagged.
    assert!(summary[0].anomalies >= 1 && summary[0].anomalies <= 14);
    assert!(summary[0].residual_threshold > 0.0);
}
