//! The pricing pipeline: transform → split → search → gate → predict → rank
//!
//! One linear pass per invocation and transmission type. The pipeline holds
//! no state between invocations; callers that want to reuse a trained model
//! keep the returned [`SelectedModel`] (see [`crate::cache::ModelCache`]).

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::data::Transmission;
use crate::error::Result;
use crate::preprocessing::{features_for, ListingFeatures};
use crate::selection::{evaluate_candidates, select_best, SelectedModel};
use crate::training::metrics::mean_absolute_error;
use crate::training::{
    search_all, train_test_split, SearchConfig, DEFAULT_FOREST_SEED, DEFAULT_PARTITION_SEED,
};

/// Pipeline configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fraction of rows held out for generalization scoring
    pub holdout_fraction: f64,
    /// Seed for the train/holdout shuffle
    pub partition_seed: u64,
    /// Number of cross-validation folds per grid point
    pub cv_folds: usize,
    /// Bootstrap seed for the tree-ensemble family
    pub forest_seed: u64,
    /// Number of picks returned by the ranking
    pub top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
            partition_seed: DEFAULT_PARTITION_SEED,
            cv_folds: 5,
            forest_seed: DEFAULT_FOREST_SEED,
            top_n: 5,
        }
    }
}

/// One scored listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub name: String,
    pub reference: String,
    /// Row position in the source table
    pub row_index: usize,
    pub actual: f64,
    pub predicted: f64,
    /// predicted − actual; large positive means underpriced
    pub residual: f64,
}

/// Full-table scoring output for one transmission type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionTable {
    pub predictions: Vec<Prediction>,
    /// Mean absolute error over every scored listing
    pub mae: f64,
}

/// One ranked pick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub name: String,
    /// Stable identifier, usable without re-indexing the table
    pub reference: String,
    /// Row position in the source table
    pub row_index: usize,
}

/// The most underpriced listings, best first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPicks {
    picks: Vec<Pick>,
}

impl TopPicks {
    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pick> {
        self.picks.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.picks.iter().map(|p| p.name.clone()).collect()
    }

    pub fn row_indices(&self) -> Vec<usize> {
        self.picks.iter().map(|p| p.row_index).collect()
    }

    pub fn references(&self) -> Vec<String> {
        self.picks.iter().map(|p| p.reference.clone()).collect()
    }
}

/// Everything one invocation produces
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub selected: SelectedModel,
    pub table: PredictionTable,
    pub picks: TopPicks,
}

/// The pricing pipeline
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Train and select a model for one transmission partition:
    /// transform → split → search(×4) → gate.
    pub fn train(&self, df: &DataFrame, transmission: Transmission) -> Result<SelectedModel> {
        let features = features_for(df, transmission)?;
        self.train_on_features(&features)
    }

    fn train_on_features(&self, features: &ListingFeatures) -> Result<SelectedModel> {
        let split = train_test_split(
            &features.x,
            &features.y,
            self.config.holdout_fraction,
            self.config.partition_seed,
        )?;

        let search_config = SearchConfig {
            cv_folds: self.config.cv_folds,
            forest_seed: self.config.forest_seed,
        };
        let fitted = search_all(&split.x_train, &split.y_train, &search_config)?;
        let candidates = evaluate_candidates(fitted, &split)?;
        select_best(candidates)
    }

    /// Score every listing of the requested transmission with the selected
    /// model. The whole inventory is scored, training rows included: the
    /// point is to compare real asking prices against the estimate.
    pub fn score(
        &self,
        df: &DataFrame,
        transmission: Transmission,
        model: &SelectedModel,
    ) -> Result<PredictionTable> {
        let features = features_for(df, transmission)?;
        self.score_features(&features, transmission, model)
    }

    fn score_features(
        &self,
        features: &ListingFeatures,
        transmission: Transmission,
        model: &SelectedModel,
    ) -> Result<PredictionTable> {
        let predicted = model.candidate.model.predict(&features.x)?;
        let mae = mean_absolute_error(&features.y, &predicted);

        let predictions = features
            .rows
            .iter()
            .zip(features.y.iter().zip(predicted.iter()))
            .map(|(row, (&actual, &predicted))| Prediction {
                name: row.name.clone(),
                reference: row.reference.clone(),
                row_index: row.row_index,
                actual,
                predicted,
                residual: predicted - actual,
            })
            .collect();

        tracing::info!(
            transmission = %transmission,
            family = %model.candidate.family,
            mae,
            "mean absolute error of selected model"
        );

        Ok(PredictionTable { predictions, mae })
    }

    /// Full pass: train, score, rank.
    pub fn run(&self, df: &DataFrame, transmission: Transmission) -> Result<PipelineOutcome> {
        let features = features_for(df, transmission)?;
        let selected = self.train_on_features(&features)?;
        let table = self.score_features(&features, transmission, &selected)?;
        let picks = rank_underpriced(&table, self.config.top_n);

        Ok(PipelineOutcome {
            selected,
            table,
            picks,
        })
    }
}

/// Sort by residual descending (stable: ties keep table order) and take the
/// first `top_n`. Fewer than `top_n` scored listings yields all of them.
pub fn rank_underpriced(table: &PredictionTable, top_n: usize) -> TopPicks {
    let mut ranked: Vec<&Prediction> = table.predictions.iter().collect();
    ranked.sort_by(|a, b| {
        b.residual
            .partial_cmp(&a.residual)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let picks = ranked
        .into_iter()
        .take(top_n)
        .map(|p| Pick {
            name: p.name.clone(),
            reference: p.reference.clone(),
            row_index: p.row_index,
        })
        .collect();

    TopPicks { picks }
}

/// Select the most underpriced listings for one transmission type with the
/// default configuration. Emits one diagnostic MAE log line.
pub fn select_underpriced(df: &DataFrame, transmission: Transmission) -> Result<TopPicks> {
    Ok(Pipeline::default().run(df, transmission)?.picks)
}
