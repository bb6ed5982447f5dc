//! Isolation Forest anomaly scorer.
//!
//! Each tree recursively splits a row subsample on a random feature at a
//! random threshold. Outliers isolate in fewer splits, so a shorter average
//! path length across the forest maps to a higher score:
//!
//!   s(x, n) = 2^(-E[h(x)] / c(n))
//!
//! The label threshold is the (1 - contamination) percentile of the
//! training scores; rows strictly above it are labeled suspicious.

use crate::{
    error::{DetectorError, DetectorResult},
    rng::StageRng,
    scorer::AnomalyScorer,
    stats::percentile,
    types::{Label, LABEL_NORMAL, LABEL_SUSPICIOUS},
};
use ndarray::{Array2, ArrayView1};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
pub enum IsolationTree {
    Internal {
        feature: usize,
        threshold: f64,
        /// Rows with value < threshold.
        left: Box<IsolationTree>,
        /// Rows with value >= threshold.
        right: Box<IsolationTree>,
    },
    External {
        size: usize,
    },
}

impl IsolationTree {
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut StageRng,
    ) -> Self {
        let n_samples = indices.len();
        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        // Draw only among features that still vary inside this node.
        let splittable: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (lo, hi) = indices
                    .iter()
                    .map(|&i| x[[i, feature]])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
                (hi - lo > 1e-10).then_some((feature, lo, hi))
            })
            .collect();

        if splittable.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let (feature, min_val, max_val) = splittable[rng.next_index(splittable.len())];

        let threshold = rng.uniform(min_val, max_val);

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] < threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let left = Box::new(Self::build(x, &left_indices, height + 1, max_height, rng));
        let right = Box::new(Self::build(x, &right_indices, height + 1, max_height, rng));

        IsolationTree::Internal { feature, threshold, left, right }
    }

    pub fn path_length(&self, sample: ArrayView1<f64>, current_height: usize) -> f64 {
        match self {
            IsolationTree::External { size } => current_height as f64 + average_path_length(*size),
            IsolationTree::Internal { feature, threshold, left, right } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, current_height + 1)
                } else {
                    right.path_length(sample, current_height + 1)
                }
            }
        }
    }
}

/// c(n): average path length of an unsuccessful BST search over n points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n_f = n as f64;
            2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    contamination: f64,
    trees: Option<Vec<IsolationTree>>,
    threshold: Option<f64>,
    /// Subsample size actually used per tree.
    samples_per_tree: usize,
}

impl IsolationForest {
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            trees: None,
            threshold: None,
            samples_per_tree: 0,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(1);
        self
    }

    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.as_ref().map_or(0, Vec::len)
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyScorer for IsolationForest {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn fit(&mut self, x: &Array2<f64>, rng: &mut StageRng) -> DetectorResult<()> {
        let n_samples = x.nrows();
        self.samples_per_tree = self.max_samples.min(n_samples);

        if n_samples == 0 {
            self.trees = Some(Vec::new());
            self.threshold = None;
            return Ok(());
        }

        let max_height = (self.samples_per_tree.max(2) as f64).log2().ceil() as usize;

        let trees: Vec<IsolationTree> = (0..self.n_estimators)
            .map(|_| {
                let indices = rng.sample_indices(n_samples, self.samples_per_tree);
                IsolationTree::build(x, &indices, 0, max_height, rng)
            })
            .collect();
        self.trees = Some(trees);

        let scores = self.score_samples(x)?;
        self.threshold = percentile(&scores, 100.0 * (1.0 - self.contamination));

        log::debug!(
            "{} [{}]: {} trees, {} samples/tree, threshold={:?}",
            self.name(),
            rng.name,
            self.n_trees(),
            self.samples_per_tree,
            self.threshold
        );
        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> DetectorResult<Vec<f64>> {
        let trees = self.trees.as_ref().ok_or(DetectorError::ModelNotFitted)?;
        if x.nrows() == 0 {
            return Ok(Vec::new());
        }
        if trees.is_empty() {
            return Err(DetectorError::ModelNotFitted);
        }

        let c_n = average_path_length(self.samples_per_tree);
        let normalizer = if c_n > 0.0 { c_n } else { 1.0 };

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let avg_path = trees.iter().map(|t| t.path_length(row, 0)).sum::<f64>()
                    / trees.len() as f64;
                2.0_f64.powf(-avg_path / normalizer)
            })
            .collect())
    }

    fn predict(&self, x: &Array2<f64>) -> DetectorResult<Vec<Label>> {
        let scores = self.score_samples(x)?;
        let Some(threshold) = self.threshold else {
            return Ok(vec![LABEL_NORMAL; scores.len()]);
        };
        Ok(scores
            .into_iter()
            .map(|s| if s > threshold { LABEL_SUSPICIOUS } else { LABEL_NORMAL })
            .collect())
    }

    fn threshold(&self) -> Option<f64> {
        self.threshold
    }
}
