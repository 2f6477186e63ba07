//! Hyperparameter search across the four model families
//!
//! Each family runs an independent grid search scored by k-fold
//! cross-validation on the train partition and yields exactly one fitted
//! candidate. Families are statistically independent, so they fan out on the
//! rayon pool; grid points within a family evaluate in parallel too.
//!
//! A family that cannot fit (for instance fewer train rows than folds)
//! fails the whole search — a partial candidate set is never returned.

use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::cross_validation::{CvScores, FoldSplit, KFold};
use super::knn::{KnnConfig, KnnRegressor, WeightScheme};
use super::linear::LinearRegression;
use super::metrics::r_squared;
use super::random_forest::{ForestRegressor, DEFAULT_FOREST_SEED};
use super::svr::{SvrConfig, SvrRegressor};
use crate::error::{ArgusError, Result};

/// Neighbor counts searched by the nearest-neighbors family.
const KNN_NEIGHBOR_GRID: std::ops::RangeInclusive<usize> = 1..=9;
/// Ensemble sizes searched by the tree-ensemble family.
const FOREST_SIZE_GRID: [usize; 6] = [8, 16, 32, 64, 128, 256];
/// Regularization strengths and margin tolerances searched by the margin
/// family (full C × ε cross product).
const SVR_C_GRID: [f64; 5] = [0.1, 1.0, 10.0, 100.0, 1000.0];
const SVR_EPSILON_GRID: [f64; 5] = [0.1, 1.0, 10.0, 100.0, 1000.0];

/// The four model families under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    NearestNeighbors,
    TreeEnsemble,
    MarginRegression,
    Linear,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::NearestNeighbors,
        ModelFamily::TreeEnsemble,
        ModelFamily::MarginRegression,
        ModelFamily::Linear,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::NearestNeighbors => "nearest-neighbors",
            ModelFamily::TreeEnsemble => "random-forest",
            ModelFamily::MarginRegression => "svr",
            ModelFamily::Linear => "linear",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Hyperparameters retained by a family search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TunedParams {
    Knn { n_neighbors: usize, weights: WeightScheme },
    Forest { n_estimators: usize },
    Svr { c: f64, epsilon: f64 },
    Linear,
}

/// A fitted regressor of any family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Regressor {
    Knn(KnnRegressor),
    Forest(ForestRegressor),
    Svr(SvrRegressor),
    Linear(LinearRegression),
}

impl Regressor {
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Regressor::Knn(m) => m.fit(x, y),
            Regressor::Forest(m) => m.fit(x, y).map(|_| ()),
            Regressor::Svr(m) => m.fit(x, y),
            Regressor::Linear(m) => m.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Regressor::Knn(m) => m.predict(x),
            Regressor::Forest(m) => m.predict(x),
            Regressor::Svr(m) => m.predict(x),
            Regressor::Linear(m) => m.predict(x),
        }
    }

    /// Coefficient of determination on the given data.
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let pred = self.predict(x)?;
        Ok(r_squared(y, &pred))
    }
}

/// One family's search result: its best grid point, refitted on the full
/// train partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedCandidate {
    pub family: ModelFamily,
    pub params: TunedParams,
    pub model: Regressor,
    /// Mean cross-validated score of the retained grid point; None for the
    /// linear family, which has no grid.
    pub cv_score: Option<f64>,
}

/// Search configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of cross-validation folds
    pub cv_folds: usize,
    /// Bootstrap seed for the tree-ensemble family
    pub forest_seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            forest_seed: DEFAULT_FOREST_SEED,
        }
    }
}

/// Run all four family searches on the train partition, in parallel.
/// Returns the candidates in [`ModelFamily::ALL`] order.
pub fn search_all(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    config: &SearchConfig,
) -> Result<Vec<FittedCandidate>> {
    if x_train.nrows() != y_train.len() {
        return Err(ArgusError::ShapeError {
            expected: format!("y length = {}", x_train.nrows()),
            actual: format!("y length = {}", y_train.len()),
        });
    }

    let folds = KFold::new(config.cv_folds).split(x_train.nrows())?;

    let mut candidates: Vec<(usize, FittedCandidate)> = ModelFamily::ALL
        .par_iter()
        .enumerate()
        .map(|(i, family)| {
            let candidate = match family {
                ModelFamily::NearestNeighbors => search_knn(x_train, y_train, &folds)?,
                ModelFamily::TreeEnsemble => {
                    search_forest(x_train, y_train, &folds, config.forest_seed)?
                }
                ModelFamily::MarginRegression => search_svr(x_train, y_train, &folds)?,
                ModelFamily::Linear => fit_linear(x_train, y_train)?,
            };
            tracing::debug!(
                family = %candidate.family,
                cv_score = ?candidate.cv_score,
                "family search finished"
            );
            Ok((i, candidate))
        })
        .collect::<Result<Vec<_>>>()?;

    candidates.sort_by_key(|(i, _)| *i);
    Ok(candidates.into_iter().map(|(_, c)| c).collect())
}

/// Evaluate a grid of (params, unfitted model) pairs with k-fold CV and
/// refit the best grid point on the full partition. Ties keep the earliest
/// grid point, so the search is deterministic.
fn evaluate_grid(
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: &[FoldSplit],
    family: ModelFamily,
    grid: Vec<(TunedParams, Regressor)>,
) -> Result<FittedCandidate> {
    let scored: Vec<f64> = grid
        .par_iter()
        .map(|(_, model)| cv_mean_score(x, y, folds, model))
        .collect::<Result<Vec<_>>>()?;

    let mut best_idx = 0;
    for (i, &score) in scored.iter().enumerate() {
        if score > scored[best_idx] {
            best_idx = i;
        }
    }

    let (params, mut model) = grid
        .into_iter()
        .nth(best_idx)
        .ok_or_else(|| ArgusError::TrainingError(format!("empty grid for {family}")))?;
    model.fit(x, y)?;

    Ok(FittedCandidate {
        family,
        params,
        model,
        cv_score: Some(scored[best_idx]),
    })
}

/// Mean R² of one unfitted model across all folds.
fn cv_mean_score(
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: &[FoldSplit],
    model: &Regressor,
) -> Result<f64> {
    let scores: Vec<f64> = folds
        .iter()
        .map(|fold| {
            let x_fit = x.select(Axis(0), &fold.train_indices);
            let y_fit = Array1::from_iter(fold.train_indices.iter().map(|&i| y[i]));
            let x_val = x.select(Axis(0), &fold.test_indices);
            let y_val = Array1::from_iter(fold.test_indices.iter().map(|&i| y[i]));

            let mut candidate = model.clone();
            candidate.fit(&x_fit, &y_fit)?;
            candidate.score(&x_val, &y_val)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CvScores::from_scores(scores).mean_score)
}

fn search_knn(x: &Array2<f64>, y: &Array1<f64>, folds: &[FoldSplit]) -> Result<FittedCandidate> {
    let grid: Vec<(TunedParams, Regressor)> = KNN_NEIGHBOR_GRID
        .flat_map(|k| {
            [WeightScheme::Uniform, WeightScheme::Distance]
                .into_iter()
                .map(move |weights| {
                    (
                        TunedParams::Knn {
                            n_neighbors: k,
                            weights,
                        },
                        Regressor::Knn(KnnRegressor::new(KnnConfig {
                            n_neighbors: k,
                            weights,
                        })),
                    )
                })
        })
        .collect();

    evaluate_grid(x, y, folds, ModelFamily::NearestNeighbors, grid)
}

fn search_forest(
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: &[FoldSplit],
    seed: u64,
) -> Result<FittedCandidate> {
    let grid: Vec<(TunedParams, Regressor)> = FOREST_SIZE_GRID
        .iter()
        .map(|&n_estimators| {
            (
                TunedParams::Forest { n_estimators },
                Regressor::Forest(ForestRegressor::new(n_estimators).with_seed(seed)),
            )
        })
        .collect();

    evaluate_grid(x, y, folds, ModelFamily::TreeEnsemble, grid)
}

fn search_svr(x: &Array2<f64>, y: &Array1<f64>, folds: &[FoldSplit]) -> Result<FittedCandidate> {
    let grid: Vec<(TunedParams, Regressor)> = SVR_C_GRID
        .iter()
        .flat_map(|&c| {
            SVR_EPSILON_GRID.iter().map(move |&epsilon| {
                (
                    TunedParams::Svr { c, epsilon },
                    Regressor::Svr(SvrRegressor::new(SvrConfig {
                        c,
                        epsilon,
                        ..Default::default()
                    })),
                )
            })
        })
        .collect();

    evaluate_grid(x, y, folds, ModelFamily::MarginRegression, grid)
}

/// Single candidate, no grid: ordinary least squares.
fn fit_linear(x: &Array2<f64>, y: &Array1<f64>) -> Result<FittedCandidate> {
    let mut model = Regressor::Linear(LinearRegression::new());
    model.fit(x, y)?;

    Ok(FittedCandidate {
        family: ModelFamily::Linear,
        params: TunedParams::Linear,
        model,
        cv_score: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    /// 24 rows, price linear in the second feature, mild variation elsewhere.
    fn train_data() -> (Array2<f64>, Array1<f64>) {
        let n = 24;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => 1.0 / (30_000.0 + 1_000.0 * i as f64),
            1 => 100.0 + 10.0 * i as f64,
            _ => (i % 4) as f64,
        });
        let y = Array1::from_iter((0..n).map(|i| 5_000.0 + 30.0 * (100.0 + 10.0 * i as f64)));
        (x, y)
    }

    #[test]
    fn test_search_all_yields_four_families_in_order() {
        let (x, y) = train_data();
        let candidates = search_all(&x, &y, &SearchConfig::default()).unwrap();

        let families: Vec<ModelFamily> = candidates.iter().map(|c| c.family).collect();
        assert_eq!(families, ModelFamily::ALL.to_vec());
    }

    #[test]
    fn test_grid_families_report_cv_score() {
        let (x, y) = train_data();
        let candidates = search_all(&x, &y, &SearchConfig::default()).unwrap();

        for candidate in &candidates {
            match candidate.family {
                ModelFamily::Linear => assert!(candidate.cv_score.is_none()),
                _ => assert!(candidate.cv_score.is_some()),
            }
        }
    }

    #[test]
    fn test_linear_family_fits_linear_data() {
        let (x, y) = train_data();
        let candidates = search_all(&x, &y, &SearchConfig::default()).unwrap();

        let linear = &candidates[3];
        let score = linear.model.score(&x, &y).unwrap();
        assert!(score > 0.999, "linear train score {score} should be ~1");
    }

    #[test]
    fn test_degenerate_train_set_is_fatal() {
        let x = Array2::from_shape_fn((4, 2), |(i, j)| (i + j) as f64);
        let y = Array1::from_iter((0..4).map(|i| i as f64));

        let err = search_all(&x, &y, &SearchConfig::default());
        assert!(matches!(err, Err(ArgusError::ValidationError(_))));
    }

    #[test]
    fn test_search_is_deterministic() {
        let (x, y) = train_data();
        let a = search_all(&x, &y, &SearchConfig::default()).unwrap();
        let b = search_all(&x, &y, &SearchConfig::default()).unwrap();

        for (ca, cb) in a.iter().zip(b.iter()) {
            assert_eq!(ca.params, cb.params);
            assert_eq!(ca.cv_score, cb.cv_score);
            assert_eq!(
                ca.model.predict(&x).unwrap(),
                cb.model.predict(&x).unwrap()
            );
        }
    }
}
