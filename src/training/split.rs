//! Train/holdout partitioning
//!
//! The partition is shuffled so it is not confounded by listing order, and
//! seeded so repeated invocations on the same table compare models on the
//! same rows.

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{ArgusError, Result};

/// Partition seed used by the default pipeline configuration.
pub const DEFAULT_PARTITION_SEED: u64 = 54;

/// One train/holdout partition of a feature matrix.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Shuffle rows with a seeded generator, then split off the trailing
/// `test_fraction` as the holdout partition.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = x.nrows();
    if n != y.len() {
        return Err(ArgusError::ShapeError {
            expected: format!("y length = {n}"),
            actual: format!("y length = {}", y.len()),
        });
    }
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(ArgusError::ValidationError(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let test_size = (n as f64 * test_fraction) as usize;
    if test_size == 0 || test_size == n {
        return Err(ArgusError::ValidationError(format!(
            "cannot split {n} rows into non-empty train and holdout partitions"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (train_idx, test_idx) = indices.split_at(n - test_size);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_train: Array1::from_iter(train_idx.iter().map(|&i| y[i])),
        y_test: Array1::from_iter(test_idx.iter().map(|&i| y[i])),
    })
}
