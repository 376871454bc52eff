//! Risk-scoring pipeline.
//!
//! - **features**: raw usage table to calendar, lag, and rolling features.
//! - **anomaly**: standardised isolation-forest scoring per region.
//! - **risk**: residual and anomaly fusion with causal smoothing.
//! - **ranking**: per-region summaries and the inspection order.

pub mod anomaly;
pub mod features;
pub mod ranking;
pub mod risk;

use chrono::NaiveDate;

use aquarisk_core::{FeatureRow, RiskResult};

use crate::model::ModelSet;

use self::features::region_rows;
use self::risk::{build_risk_rows, RiskRow};

/// Score every row of `region` in the preprocessed `table`.
///
/// Fails with `NotTrained` before touching any row when the region has no
/// model. A trained region absent from the table yields an empty series.
pub fn score_region(
    models: &ModelSet,
    table: &[FeatureRow],
    region: &str,
    cutoff: Option<NaiveDate>,
) -> RiskResult<Vec<RiskRow>> {
    let model = models.get(region)?;
    build_risk_rows(model, region_rows(table, region), cutoff)
}
