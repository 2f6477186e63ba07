//! Candidate evaluation and selection
//!
//! Every family candidate is scored on the train and holdout partitions.
//! A candidate whose scores diverge by more than the overfit threshold is
//! flagged as memorizing rather than generalizing; selection prefers the
//! best-generalizing unflagged candidate and only falls back to a flagged
//! one when nothing else is available.

use serde::{Deserialize, Serialize};

use crate::error::{ArgusError, Result};
use crate::training::split::TrainTestSplit;
use crate::training::{FittedCandidate, ModelFamily, Regressor, TunedParams};

/// Maximum tolerated |train − holdout| score gap before a candidate is
/// flagged as overfit. The comparison is strict: a gap of exactly 0.3 is
/// still admissible.
pub const OVERFIT_THRESHOLD: f64 = 0.3;

/// A fitted candidate with its train/holdout evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub family: ModelFamily,
    pub params: TunedParams,
    pub model: Regressor,
    /// Mean cross-validated score from the grid search (None for the
    /// linear family).
    pub cv_score: Option<f64>,
    /// Coefficient of determination on the train partition
    pub train_score: f64,
    /// Coefficient of determination on the holdout partition
    pub holdout_score: f64,
    /// Whether the score gap exceeds [`OVERFIT_THRESHOLD`]
    pub overfit: bool,
}

/// The candidate chosen for downstream scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedModel {
    pub candidate: ModelCandidate,
    /// True when every candidate was overfit and selection fell back to the
    /// globally best holdout score.
    pub degraded: bool,
}

/// Overfit rule: |train − holdout| strictly above the threshold.
pub fn is_overfit(train_score: f64, holdout_score: f64) -> bool {
    (train_score - holdout_score).abs() > OVERFIT_THRESHOLD
}

/// Score every fitted candidate on both partitions and derive its overfit
/// flag.
pub fn evaluate_candidates(
    fitted: Vec<FittedCandidate>,
    split: &TrainTestSplit,
) -> Result<Vec<ModelCandidate>> {
    fitted
        .into_iter()
        .map(|candidate| {
            let train_score = candidate.model.score(&split.x_train, &split.y_train)?;
            let holdout_score = candidate.model.score(&split.x_test, &split.y_test)?;

            Ok(ModelCandidate {
                family: candidate.family,
                params: candidate.params,
                model: candidate.model,
                cv_score: candidate.cv_score,
                train_score,
                holdout_score,
                overfit: is_overfit(train_score, holdout_score),
            })
        })
        .collect()
}

/// Pick the non-overfit candidate with the best holdout score. When every
/// candidate is overfit, fall back to the global best holdout score and warn:
/// the result is degraded but usable.
pub fn select_best(candidates: Vec<ModelCandidate>) -> Result<SelectedModel> {
    if candidates.is_empty() {
        return Err(ArgusError::ValidationError(
            "no candidates to select from".to_string(),
        ));
    }

    let all_overfit = candidates.iter().all(|c| c.overfit);
    if all_overfit {
        tracing::warn!(
            "every model family is overfit; falling back to the best holdout score"
        );
    }

    let mut best: Option<ModelCandidate> = None;
    for candidate in candidates {
        if !all_overfit && candidate.overfit {
            continue;
        }
        let replace = match &best {
            Some(current) => candidate.holdout_score > current.holdout_score,
            None => true,
        };
        if replace {
            best = Some(candidate);
        }
    }

    let candidate = best.ok_or_else(|| {
        ArgusError::ComputationError("candidate selection produced no model".to_string())
    })?;

    tracing::debug!(
        family = %candidate.family,
        train_score = candidate.train_score,
        holdout_score = candidate.holdout_score,
        degraded = all_overfit,
        "model selected"
    );

    Ok(SelectedModel {
        candidate,
        degraded: all_overfit,
    })
}
