//! Model training
//!
//! The four regression families the search engine compares:
//! - K-Nearest Neighbors
//! - Random forest (bagged regression trees)
//! - Margin regression (scaled ε-SVR)
//! - Ordinary least squares

pub mod cross_validation;
pub mod decision_tree;
pub mod knn;
pub mod linear;
pub mod metrics;
pub mod random_forest;
pub mod search;
pub mod split;
pub mod svr;

pub use cross_validation::{CvScores, FoldSplit, KFold};
pub use knn::{KnnConfig, KnnRegressor, WeightScheme};
pub use linear::LinearRegression;
pub use random_forest::{ForestRegressor, DEFAULT_FOREST_SEED};
pub use search::{search_all, FittedCandidate, ModelFamily, Regressor, SearchConfig, TunedParams};
pub use split::{train_test_split, TrainTestSplit, DEFAULT_PARTITION_SEED};
pub use svr::{SvrConfig, SvrRegressor};
