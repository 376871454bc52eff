use std::collections::BTreeMap;

use chrono::Datelike;
use aquarisk_core::{FeatureRow, UsageRecord};

use crate::stats::{mean, sample_std};

/// Trailing window for the rolling statistics, in rows.
pub const ROLLING_WINDOW: usize = 7;

/// Build the feature table from raw usage records.
///
/// Input order does not matter. The output is sorted by `(region, date)` and
/// holds exactly one row per record. Lags and rolling windows are computed by
/// row position within each region, so a missing day is not zero-filled.
pub fn preprocess(records: &[UsageRecord]) -> Vec<FeatureRow> {
    let mut by_region: BTreeMap<&str, Vec<&UsageRecord>> = BTreeMap::new();
    for record in records {
        by_region.entry(record.region.as_str()).or_default().push(record);
    }

    let mut rows = Vec::with_capacity(records.len());
    for (_, mut series) in by_region {
        series.sort_by_key(|r| r.date);
        let usage: Vec<f64> = series.iter().map(|r| r.daily_usage).collect();

        for (i, record) in series.iter().enumerate() {
            let window = &usage[(i + 1).saturating_sub(ROLLING_WINDOW)..=i];
            let weekday = record.date.weekday();
            rows.push(FeatureRow {
                region: record.region.clone(),
                date: record.date,
                daily_usage: record.daily_usage,
                day_of_week: weekday.num_days_from_monday() as u8,
                month: record.date.month() as u8,
                is_weekend: weekday.num_days_from_monday() >= 5,
                prev_day_usage: i.checked_sub(1).map(|j| usage[j]),
                prev_week_usage: i.checked_sub(7).map(|j| usage[j]),
                rolling_mean_7d: mean(window).unwrap_or(record.daily_usage),
                rolling_std_7d: sample_std(window),
            });
        }
    }
    rows
}

/// Rows of one region, in date order. Relies on `preprocess` ordering.
pub fn region_rows<'a>(table: &'a [FeatureRow], region: &str) -> &'a [FeatureRow] {
    let start = table.partition_point(|r| r.region.as_str() < region);
    let end = table.partition_point(|r| r.region.as_str() <= region);
    &table[start..end]
}

/// Distinct region names in table order (ascending).
pub fn regions(table: &[FeatureRow]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in table {
        if names.last().map(String::as_str) != Some(row.region.as_str()) {
            names.push(row.region.clone());
        }
    }
    names
}
