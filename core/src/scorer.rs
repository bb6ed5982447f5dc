//! AnomalyScorer trait.
//!
//! RULE: A scorer is fit fresh on the run's scaled matrix and
//! discarded with the run. Nothing is persisted or reused.

use crate::{
    error::DetectorResult,
    rng::StageRng,
    types::Label,
};
use ndarray::Array2;

/// The contract every unsupervised outlier model must fulfill.
pub trait AnomalyScorer {
    /// Unique stable name, used in logs and the run report.
    fn name(&self) -> &'static str;

    /// Fit on `x`. All randomness must come from `rng`.
    fn fit(&mut self, x: &Array2<f64>, rng: &mut StageRng) -> DetectorResult<()>;

    /// Anomaly score per row. Higher means more anomalous.
    fn score_samples(&self, x: &Array2<f64>) -> DetectorResult<Vec<f64>>;

    /// Binary label per row, aligned with the rows of `x`.
    fn predict(&self, x: &Array2<f64>) -> DetectorResult<Vec<Label>>;

    /// Score cut-off chosen during fit, if any.
    fn threshold(&self) -> Option<f64>;

    fn fit_predict(&mut self, x: &Array2<f64>, rng: &mut StageRng) -> DetectorResult<Vec<Label>> {
        self.fit(x, rng)?;
        self.predict(x)
    }
}
