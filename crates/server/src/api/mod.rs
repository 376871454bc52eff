//! HTTP handlers, grouped by concern.
//!
//! Numeric fields are rounded to two decimals here, at the boundary; the
//! compute crate always works at full precision.

pub mod doc;
pub mod health;
pub mod live;
pub mod risk;

/// Round to two decimals for API output.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(-0.004), -0.0);
        assert_eq!(round2(70.0), 70.0);
    }
}
