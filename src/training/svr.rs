//! Margin regression: ε-insensitive support vector regressor
//!
//! Inputs are range-scaled then standardized before the RBF-kernel fit; both
//! scalers are fitted on the training partition and replayed at prediction
//! time, so the scaling travels with the candidate.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ArgusError, Result};
use crate::preprocessing::{Scaler, ScalerKind};

/// SVR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvrConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Width of the ε-insensitive tube
    pub epsilon: f64,
    /// RBF kernel coefficient; None resolves to 1 / (n_features · var(X))
    /// on the scaled training data
    pub gamma: Option<f64>,
    /// Tolerance for the convergence check
    pub tol: f64,
    /// Maximum number of training sweeps
    pub max_iter: usize,
}

impl Default for SvrConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            gamma: None,
            tol: 1e-3,
            max_iter: 1000,
        }
    }
}

/// Support vector regressor with embedded scaling pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvrRegressor {
    config: SvrConfig,
    range_scaler: Scaler,
    standard_scaler: Scaler,
    support_vectors: Option<Array2<f64>>,
    alphas: Option<Array1<f64>>, // alpha - alpha*
    bias: f64,
    gamma: f64,
    is_fitted: bool,
}

impl SvrRegressor {
    pub fn new(config: SvrConfig) -> Self {
        Self {
            config,
            range_scaler: Scaler::new(ScalerKind::MinMax),
            standard_scaler: Scaler::new(ScalerKind::Standard),
            support_vectors: None,
            alphas: None,
            bias: 0.0,
            gamma: 1.0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &SvrConfig {
        &self.config
    }

    /// Fit the regressor: scale the inputs, then run gradient updates on the
    /// ε-insensitive loss.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(ArgusError::ShapeError {
                expected: format!("y length = {n}"),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n == 0 {
            return Err(ArgusError::ValidationError(
                "cannot fit SVR on empty training set".to_string(),
            ));
        }

        let ranged = self.range_scaler.fit_transform(x)?;
        let scaled = self.standard_scaler.fit_transform(&ranged)?;

        self.gamma = match self.config.gamma {
            Some(g) => g,
            None => resolve_gamma(&scaled),
        };

        let mut alphas: Array1<f64> = Array1::zeros(n);
        let mut alphas_star: Array1<f64> = Array1::zeros(n);
        let mut bias: f64 = 0.0;

        let kernel_matrix = self.compute_kernel_matrix(&scaled);

        let learning_rate: f64 = 0.01;

        for _iter in 0..self.config.max_iter {
            let mut max_change: f64 = 0.0;

            for i in 0..n {
                let mut pred: f64 = bias;
                for j in 0..n {
                    pred += (alphas[j] - alphas_star[j]) * kernel_matrix[[j, i]];
                }

                let error: f64 = pred - y[i];

                if error > self.config.epsilon {
                    let new_val = (alphas_star[i] + learning_rate).min(self.config.c);
                    max_change = max_change.max((new_val - alphas_star[i]).abs());
                    alphas_star[i] = new_val;
                } else if error < -self.config.epsilon {
                    let new_val = (alphas[i] + learning_rate).min(self.config.c);
                    max_change = max_change.max((new_val - alphas[i]).abs());
                    alphas[i] = new_val;
                }

                let bias_update = learning_rate * 0.1 * error;
                max_change = max_change.max(bias_update.abs());
                bias -= bias_update;
            }

            if max_change < self.config.tol {
                break;
            }
        }

        let combined_alphas = &alphas - &alphas_star;

        let support_indices: Vec<usize> = combined_alphas
            .iter()
            .enumerate()
            .filter(|(_, a)| a.abs() > 1e-8)
            .map(|(i, _)| i)
            .collect();

        if support_indices.is_empty() {
            // Every point landed inside the tube; keep them all.
            self.support_vectors = Some(scaled);
            self.alphas = Some(combined_alphas);
        } else {
            let n_features = scaled.ncols();
            let mut support_vectors = Array2::zeros((support_indices.len(), n_features));
            let mut support_alphas = Array1::zeros(support_indices.len());

            for (i, &idx) in support_indices.iter().enumerate() {
                support_vectors.row_mut(i).assign(&scaled.row(idx));
                support_alphas[i] = combined_alphas[idx];
            }

            self.support_vectors = Some(support_vectors);
            self.alphas = Some(support_alphas);
        }

        self.bias = bias;
        self.is_fitted = true;

        Ok(())
    }

    /// Predict target values
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(ArgusError::ModelNotFitted);
        }

        let ranged = self.range_scaler.transform(x)?;
        let scaled = self.standard_scaler.transform(&ranged)?;

        let sv = self
            .support_vectors
            .as_ref()
            .ok_or(ArgusError::ModelNotFitted)?;
        let alphas = self.alphas.as_ref().ok_or(ArgusError::ModelNotFitted)?;

        let n = scaled.nrows();
        let mut predictions = Array1::zeros(n);

        for i in 0..n {
            let sample = scaled.row(i);
            let mut sum = self.bias;

            for j in 0..sv.nrows() {
                sum += alphas[j] * self.kernel(sample, sv.row(j));
            }

            predictions[i] = sum;
        }

        Ok(predictions)
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));

        for i in 0..n {
            for j in i..n {
                let val = self.kernel(x.row(i), x.row(j));
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }

        k
    }

    /// RBF kernel: K(x, y) = exp(-γ · ||x - y||²)
    fn kernel(&self, x1: ndarray::ArrayView1<f64>, x2: ndarray::ArrayView1<f64>) -> f64 {
        let norm_sq: f64 = x1
            .iter()
            .zip(x2.iter())
            .map(|(a, b)| {
                let d = a - b;
                d * d
            })
            .sum();
        (-self.gamma * norm_sq).exp()
    }
}

/// γ = 1 / (n_features · var(X)) over the flattened scaled matrix
fn resolve_gamma(x: &Array2<f64>) -> f64 {
    let n = (x.nrows() * x.ncols()) as f64;
    if n == 0.0 {
        return 1.0;
    }
    let mean = x.sum() / n;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_svr_approximates_constant_band() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![10.0, 10.1, 9.9, 10.0, 10.05, 9.95];

        let mut svr = SvrRegressor::new(SvrConfig {
            c: 10.0,
            epsilon: 0.2,
            ..Default::default()
        });
        svr.fit(&x, &y).unwrap();

        let pred = svr.predict(&x).unwrap();
        for p in pred.iter() {
            assert!((p - 10.0).abs() < 1.0, "prediction {p} far from band");
        }
    }

    #[test]
    fn test_svr_tracks_monotone_target() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let mut svr = SvrRegressor::new(SvrConfig {
            c: 100.0,
            epsilon: 0.1,
            ..Default::default()
        });
        svr.fit(&x, &y).unwrap();

        let pred = svr.predict(&x).unwrap();
        // Ends of the range should be ordered the same way as the target.
        assert!(pred[7] > pred[0]);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let svr = SvrRegressor::new(SvrConfig::default());
        assert!(matches!(
            svr.predict(&array![[1.0]]),
            Err(ArgusError::ModelNotFitted)
        ));
    }
}
