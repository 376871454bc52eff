//! Isolation Forest outlier detector.
//!
//! Anomalies are easier to isolate and thus have shorter average path lengths
//! across randomly partitioned trees. Scores follow the usual convention of
//! the reference formulation: `score_samples = −2^(−E[h(x)] / c(ψ))`, and the
//! decision function subtracts an offset calibrated so that a `contamination`
//! share of the training data falls below zero.

use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::stats::percentile;

/// Euler–Mascheroni constant, used by the harmonic-number approximation.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// Upper bound on the per-tree subsample size.
    pub max_samples: usize,
    /// Expected outlier share, only used to place the decision offset.
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

/// Trained isolation forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    /// Subsample size ψ actually used per tree.
    sample_size: usize,
    /// Decision offset: the `contamination` quantile of training `score_samples`.
    offset: f64,
}

impl IsolationForest {
    /// Fit on (already standardised) feature vectors.
    ///
    /// Returns `None` when there is nothing to fit.
    pub fn fit(data: &[Vec<f64>], config: &ForestConfig) -> Option<Self> {
        let n = data.len();
        let n_features = data.first()?.len();
        if n_features == 0 {
            return None;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let sample_size = config.max_samples.min(n).max(1);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let trees = (0..config.n_trees.max(1))
            .map(|_| {
                let rows: Vec<&[f64]> = sample(&mut rng, n, sample_size)
                    .into_iter()
                    .map(|i| data[i].as_slice())
                    .collect();
                IsolationTree::build(&rows, n_features, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: 0.0,
        };

        let training_scores: Vec<f64> = data.iter().map(|x| forest.score_samples(x)).collect();
        forest.offset = percentile(&training_scores, config.contamination.clamp(0.0, 1.0))?;
        Some(forest)
    }

    /// Opposite of the normalised anomaly measure: lower means more abnormal.
    pub fn score_samples(&self, sample: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(sample)).sum();
        let avg_path = total / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return -0.5;
        }
        -(2.0_f64.powf(-avg_path / norm))
    }

    /// Negative for outliers, positive for inliers.
    pub fn decision_function(&self, sample: &[f64]) -> f64 {
        self.score_samples(sample) - self.offset
    }

    /// Anomaly score where higher means more anomalous.
    pub fn anomaly_score(&self, sample: &[f64]) -> f64 {
        -self.decision_function(sample)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// c(n): average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// A single isolation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    root: IsolationNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsolationNode {
    Internal {
        feature_idx: usize,
        split_value: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationTree {
    fn build<R: Rng>(rows: &[&[f64]], n_features: usize, max_depth: usize, rng: &mut R) -> Self {
        Self {
            root: Self::build_node(rows, n_features, 0, max_depth, rng),
        }
    }

    fn build_node<R: Rng>(
        rows: &[&[f64]],
        n_features: usize,
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> IsolationNode {
        if depth >= max_depth || rows.len() <= 1 {
            return IsolationNode::Leaf { size: rows.len() };
        }

        // Only features that still vary inside this node can split it.
        let ranges: Vec<(usize, f64, f64)> = (0..n_features)
            .filter_map(|f| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                    (lo.min(r[f]), hi.max(r[f]))
                });
                (hi - lo > f64::EPSILON).then_some((f, lo, hi))
            })
            .collect();
        if ranges.is_empty() {
            return IsolationNode::Leaf { size: rows.len() };
        }

        let (feature_idx, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
        let split_value = rng.gen_range(lo..hi);

        let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
            rows.iter().copied().partition(|r| r[feature_idx] < split_value);

        // `split_value` can land exactly on `lo`; keep the node a leaf then.
        if left.is_empty() || right.is_empty() {
            return IsolationNode::Leaf { size: rows.len() };
        }

        IsolationNode::Internal {
            feature_idx,
            split_value,
            left: Box::new(Self::build_node(&left, n_features, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(&right, n_features, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, sample: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => return depth as f64 + average_path_length(*size),
                IsolationNode::Internal {
                    feature_idx,
                    split_value,
                    left,
                    right,
                } => {
                    let val = sample.get(*feature_idx).copied().unwrap_or(0.0);
                    node = if val < *split_value { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}
