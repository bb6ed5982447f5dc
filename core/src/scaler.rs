//! Feature standardization: (x - mean) / std per column.
//!
//! Zero-variance policy: a column whose standard deviation is zero
//! (within floating-point noise) keeps scale 1.0, so after centering
//! every value in it becomes exactly 0.0.

use crate::error::{DetectorError, DetectorResult};
use ndarray::{Array2, Axis};

/// Fitted parameters for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    /// Population standard deviation (ddof = 0).
    pub std: f64,
    /// Divisor actually applied. Equals `std` unless the column is degenerate.
    scale: f64,
    degenerate: bool,
}

impl ColumnStats {
    fn from_values<'a>(values: impl Iterator<Item = &'a f64> + Clone) -> Self {
        let n = values.clone().count();
        if n == 0 {
            return Self { mean: 0.0, std: 0.0, scale: 1.0, degenerate: true };
        }
        let mean = values.clone().sum::<f64>() / n as f64;
        let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let std = var.sqrt();

        // Variance indistinguishable from the rounding error of the mean.
        let eps = f64::EPSILON;
        let n_f = n as f64;
        let upper_bound = n_f * eps * var + (n_f * mean * eps).powi(2);
        let degenerate = var <= upper_bound;
        let scale = if degenerate { 1.0 } else { std };
        Self { mean, std, scale, degenerate }
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    stats: Option<Vec<ColumnStats>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute mean and standard deviation of every column of `x`.
    pub fn fit(&mut self, x: &Array2<f64>) -> DetectorResult<&mut Self> {
        let stats: Vec<ColumnStats> = x
            .axis_iter(Axis(1))
            .map(|col| ColumnStats::from_values(col.iter()))
            .collect();

        if x.nrows() > 0 {
            for (j, s) in stats.iter().enumerate() {
                if s.is_degenerate() {
                    log::warn!(
                        "feature column {j} has zero variance (mean={:.4}); scaled to 0.0",
                        s.mean
                    );
                }
            }
        }

        self.stats = Some(stats);
        Ok(self)
    }

    /// Apply the fitted parameters. Output has the same shape as `x`.
    pub fn transform(&self, x: &Array2<f64>) -> DetectorResult<Array2<f64>> {
        let stats = self.stats.as_ref().ok_or(DetectorError::ModelNotFitted)?;
        if stats.len() != x.ncols() {
            return Err(anyhow::anyhow!(
                "scaler fitted on {} columns, got {}",
                stats.len(),
                x.ncols()
            )
            .into());
        }

        let mut out = x.clone();
        for (mut col, s) in out.axis_iter_mut(Axis(1)).zip(stats) {
            col.mapv_inplace(|v| (v - s.mean) / s.scale);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> DetectorResult<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Indices of columns that hit the zero-variance fallback.
    pub fn degenerate_columns(&self) -> Vec<usize> {
        self.stats
            .as_deref()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_degenerate())
            .map(|(j, _)| j)
            .collect()
    }
}
