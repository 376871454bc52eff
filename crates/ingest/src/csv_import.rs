use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use aquarisk_core::UsageRecord;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::IngestError;

/// Raw CSV row before validation.
#[derive(Debug, Deserialize)]
struct RawUsageRow {
    region: String,
    date: String,
    #[serde(alias = "daily usage")]
    daily_usage: f64,
}

pub struct UsageCsvImporter;

impl UsageCsvImporter {
    /// Load a `region,date,daily_usage` table from disk.
    pub fn import(path: &Path) -> Result<Vec<UsageRecord>, IngestError> {
        let file = std::fs::File::open(path)?;
        let records = Self::from_reader(file)?;
        info!("Imported {} usage records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Parse a usage table from any reader. Rows keep their file order.
    ///
    /// Rejects blank regions, unparseable dates, negative or non-finite usage,
    /// and duplicate `(region, date)` pairs.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<UsageRecord>, IngestError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();

        for result in csv_reader.deserialize::<RawUsageRow>() {
            let row = result?;
            // Header is line 1.
            let line = records.len() as u64 + 2;

            let region = row.region.trim().to_string();
            if region.is_empty() {
                return Err(IngestError::InvalidRow { line, reason: "empty region".to_string() });
            }

            let date = parse_date(&row.date).ok_or_else(|| IngestError::InvalidRow {
                line,
                reason: format!("unparseable date '{}'", row.date),
            })?;

            if !row.daily_usage.is_finite() || row.daily_usage < 0.0 {
                return Err(IngestError::InvalidRow {
                    line,
                    reason: format!("daily_usage must be a non-negative number, got {}", row.daily_usage),
                });
            }

            if !seen.insert((region.clone(), date)) {
                return Err(IngestError::InvalidRow {
                    line,
                    reason: format!("duplicate record for {} on {}", region, date),
                });
            }

            records.push(UsageRecord::new(region, date, row.daily_usage));
        }

        debug!(rows = records.len(), regions = seen.iter().map(|(r, _)| r).collect::<HashSet<_>>().len(), "usage table parsed");
        Ok(records)
    }
}

/// Accepts `YYYY-MM-DD` and full timestamps (`YYYY-MM-DD HH:MM:SS`, ISO `T` form).
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}
