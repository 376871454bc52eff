use serde::{Deserialize, Serialize};

/// Per-column standardisation to zero mean and unit variance.
///
/// Uses the population standard deviation. Columns without variance keep a
/// scale of 1 so they transform to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit column statistics. Returns `None` for an empty sample.
    pub fn fit(samples: &[Vec<f64>]) -> Option<Self> {
        let first = samples.first()?;
        let dim = first.len();
        let n = samples.len() as f64;

        let mut mean = vec![0.0; dim];
        for sample in samples {
            for (m, v) in mean.iter_mut().zip(sample) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; dim];
        for sample in samples {
            for ((acc, v), m) in var.iter_mut().zip(sample).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Some(Self { mean, scale })
    }

    pub fn transform(&self, sample: &[f64]) -> Vec<f64> {
        sample
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}
