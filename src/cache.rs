//! Process-wide model cache
//!
//! Trained models are expensive; the presentation layer reuses them across
//! user actions. The cache lives outside the pipeline on purpose: the
//! pipeline stays a stateless, re-enterable function and invalidation policy
//! belongs to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use polars::prelude::DataFrame;

use crate::data::Transmission;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::selection::SelectedModel;

/// Cache of selected models, keyed by transmission type.
pub struct ModelCache {
    pipeline: Pipeline,
    models: RwLock<HashMap<Transmission, Arc<SelectedModel>>>,
}

impl ModelCache {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached model for this transmission type, training one if
    /// none is cached yet.
    pub fn get_or_train(
        &self,
        df: &DataFrame,
        transmission: Transmission,
    ) -> Result<Arc<SelectedModel>> {
        if let Some(model) = self.models.read().get(&transmission) {
            return Ok(Arc::clone(model));
        }

        let model = Arc::new(self.pipeline.train(df, transmission)?);
        self.models
            .write()
            .insert(transmission, Arc::clone(&model));
        Ok(model)
    }

    /// Drop the cached model for one transmission type. Returns whether a
    /// model was cached.
    pub fn invalidate(&self, transmission: Transmission) -> bool {
        self.models.write().remove(&transmission).is_some()
    }

    /// Drop every cached model.
    pub fn clear(&self) {
        self.models.write().clear();
    }
}
