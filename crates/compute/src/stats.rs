//! Order statistics shared by the scorers and the ranking engine.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator), `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile `q ∈ [0, 1]` with linear interpolation between order statistics.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Percentile rank of every value within the slice, in `(0, 1]`.
///
/// Ties share the average of their ranks; ranks are divided by the count.
pub fn percent_rank(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1 ..= end+1
        let avg = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = avg / n as f64;
        }
        start = end + 1;
    }
    ranks
}

/// Trailing mean over the current value and up to `window − 1` predecessors.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// The last `n` values (all of them when fewer are available).
pub fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.5), Some(3.0));
        assert!((percentile(&values, 0.9).unwrap() - 4.6).abs() < 1e-12);
        assert_eq!(percentile(&values, 1.0), Some(5.0));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn percent_rank_averages_ties() {
        let ranks = percent_rank(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(ranks, vec![0.25, 0.625, 0.625, 1.0]);
    }

    #[test]
    fn percent_rank_is_order_preserving() {
        let ranks = percent_rank(&[3.0, 1.0, 2.0]);
        assert!(ranks[1] < ranks[2] && ranks[2] < ranks[0]);
        assert!(ranks.iter().all(|r| *r > 0.0 && *r <= 1.0));
    }

    #[test]
    fn nan_values_sort_last_without_disturbing_order() {
        let values = [3.0, f64::NAN, 1.0, 2.0];
        let ranks = percent_rank(&values);
        assert_eq!(ranks, vec![0.75, 1.0, 0.25, 0.5]);
        assert_eq!(percentile(&[2.0, f64::NAN, 1.0], 0.5), Some(2.0));
    }

    #[test]
    fn trailing_mean_uses_short_window_at_start() {
        let smoothed = trailing_mean(&[3.0, 6.0, 9.0, 12.0], 3);
        assert_eq!(smoothed, vec![3.0, 4.5, 6.0, 9.0]);
    }

    #[test]
    fn sample_std_needs_two_values() {
        assert_eq!(sample_std(&[5.0]), None);
        assert!((sample_std(&[2.0, 4.0]).unwrap() - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn tail_clamps_to_length() {
        assert_eq!(tail(&[1.0, 2.0, 3.0], 2), &[2.0, 3.0]);
        assert_eq!(tail(&[1.0], 5), &[1.0]);
    }
}
