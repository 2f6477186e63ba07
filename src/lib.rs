//! argus — used-car price estimation and deal-ranking engine
//!
//! Given a cleaned table of used-car listings, the crate estimates a fair
//! market price per listing and flags the listings whose asking price falls
//! furthest below the estimate, split by transmission type.
//!
//! # Modules
//!
//! ## Core pipeline
//! - [`preprocessing`] - Feature engineering and scaling
//! - [`training`] - Model families, cross-validation, hyperparameter search
//! - [`selection`] - Train/holdout evaluation and overfit gating
//! - [`pipeline`] - Full-table scoring, ranking, entry points
//!
//! ## Infrastructure
//! - [`data`] - Listing schema, transmission labels, data sources
//! - [`cache`] - Process-wide model cache keyed by transmission
//! - [`error`] - Crate error type
//!
//! The pipeline is a single linear pass per invocation:
//! load → transform → split → search(×4, parallel) → gate → predict → rank.

pub mod cache;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod preprocessing;
pub mod selection;
pub mod training;

pub use error::{ArgusError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ArgusError, Result};

    // Data layer
    pub use crate::data::{
        JsonFileSource, ListingSource, MemorySource, Transmission,
    };

    // Preprocessing
    pub use crate::preprocessing::{features_for, ListingFeatures, FEATURE_COLUMNS};

    // Training and search
    pub use crate::training::{
        search_all, FittedCandidate, ModelFamily, Regressor, SearchConfig, TunedParams,
    };

    // Selection
    pub use crate::selection::{select_best, ModelCandidate, SelectedModel, OVERFIT_THRESHOLD};

    // Pipeline
    pub use crate::pipeline::{
        rank_underpriced, select_underpriced, Pipeline, PipelineConfig, PipelineOutcome,
        Prediction, PredictionTable, TopPicks,
    };

    // Caching
    pub use crate::cache::ModelCache;
}
