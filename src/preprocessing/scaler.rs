//! Feature scaling over numeric matrices
//!
//! The margin regressor range-scales then standardizes its inputs before
//! fitting; both steps are fitted on training data only and replayed on
//! anything scored later.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{ArgusError, Result};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScalerKind {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
}

/// Parameters for one fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnParams {
    center: f64, // mean or min
    scale: f64,  // std or range
}

/// Per-column feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    kind: ScalerKind,
    params: Vec<ColumnParams>,
    is_fitted: bool,
}

impl Scaler {
    pub fn new(kind: ScalerKind) -> Self {
        Self {
            kind,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the columns of `x`.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(ArgusError::ValidationError(
                "cannot fit scaler on empty matrix".to_string(),
            ));
        }

        self.params = x
            .columns()
            .into_iter()
            .map(|col| {
                let n = col.len() as f64;
                match self.kind {
                    ScalerKind::Standard => {
                        let mean = col.sum() / n;
                        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                        let std = var.sqrt();
                        ColumnParams {
                            center: mean,
                            scale: if std == 0.0 { 1.0 } else { std },
                        }
                    }
                    ScalerKind::MinMax => {
                        let min = col.iter().copied().fold(f64::INFINITY, f64::min);
                        let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        let range = max - min;
                        ColumnParams {
                            center: min,
                            scale: if range == 0.0 { 1.0 } else { range },
                        }
                    }
                }
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform a matrix with the fitted parameters.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ArgusError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(ArgusError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (j, params) in self.params.iter().enumerate() {
            out.column_mut(j)
                .mapv_inplace(|v| (v - params.center) / params.scale);
        }
        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
