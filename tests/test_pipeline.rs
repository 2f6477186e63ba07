//! Integration tests: full pipeline end-to-end

use argus::data::columns;
use argus::pipeline::{rank_underpriced, select_underpriced, Pipeline, PredictionTable};
use argus::prelude::*;
use argus::selection::{is_overfit, ModelCandidate};
use argus::training::LinearRegression;
use ndarray::Array1;
use polars::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "argus=info".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Builds a listing table with `n_manual` manual rows followed by `n_auto`
/// automatic rows. Prices follow the monthly payment linearly with a small
/// deterministic wobble, so every family has something to fit.
fn listings_df(n_manual: usize, n_auto: usize) -> DataFrame {
    let n = n_manual + n_auto;
    let boite: Vec<&str> = (0..n)
        .map(|i| if i < n_manual { "Manuelle" } else { "Automatique" })
        .collect();
    let monthly: Vec<i64> = (0..n).map(|i| 120 + 12 * i as i64).collect();
    let price: Vec<i64> = (0..n)
        .map(|i| 4_000 + 28 * monthly[i] + 150 * (i as i64 % 3))
        .collect();

    df!(
        columns::REFERENCE => (0..n).map(|i| format!("REF-{i}")).collect::<Vec<_>>(),
        columns::NAME => (0..n).map(|i| format!("PEUGEOT 208 {i}")).collect::<Vec<_>>(),
        columns::BRAND => vec!["PEUGEOT"; n],
        columns::MODEL => vec!["208"; n],
        columns::POWER => (0..n).map(|i| 75 + (i % 6) as i64).collect::<Vec<_>>(),
        columns::ENERGY => vec!["Essence"; n],
        columns::YEAR => (0..n).map(|i| 2014 + (i % 9) as i64).collect::<Vec<_>>(),
        columns::MILEAGE => (0..n).map(|i| 15_000 + 3_500 * i as i64).collect::<Vec<_>>(),
        columns::TRANSMISSION => boite,
        columns::PRICE => price,
        columns::MONTHLY => monthly,
        columns::LOCATION => vec!["69003 Lyon"; n],
        columns::REGION_FLAG => (0..n).map(|i| i % 2 == 0).collect::<Vec<_>>(),
    )
    .unwrap()
}

/// 20 manual listings whose price is an exact noiseless linear function of
/// the monthly payment, every other feature held constant.
fn noiseless_linear_df() -> DataFrame {
    let n = 20usize;
    let monthly: Vec<i64> = (0..n).map(|i| 100 + 15 * i as i64).collect();
    let price: Vec<i64> = monthly.iter().map(|m| 2_000 + 40 * m).collect();

    df!(
        columns::REFERENCE => (0..n).map(|i| format!("LIN-{i}")).collect::<Vec<_>>(),
        columns::NAME => (0..n).map(|i| format!("RENAULT Clio {i}")).collect::<Vec<_>>(),
        columns::BRAND => vec!["RENAULT"; n],
        columns::MODEL => vec!["Clio"; n],
        columns::POWER => vec![90i64; n],
        columns::ENERGY => vec!["Essence"; n],
        columns::YEAR => vec![2019i64; n],
        columns::MILEAGE => vec![50_000i64; n],
        columns::TRANSMISSION => vec!["Manuelle"; n],
        columns::PRICE => price,
        columns::MONTHLY => monthly,
        columns::LOCATION => vec!["75015 Paris"; n],
        columns::REGION_FLAG => vec![true; n],
    )
    .unwrap()
}

#[test]
fn test_select_underpriced_returns_top_five() {
    init_tracing();
    let df = listings_df(30, 0);
    let picks = select_underpriced(&df, Transmission::Manual).unwrap();

    assert_eq!(picks.len(), 5);
    assert_eq!(picks.names().len(), 5);
    assert_eq!(picks.row_indices().len(), 5);
    assert_eq!(picks.references().len(), 5);
}

#[test]
fn test_results_sorted_by_descending_residual() {
    let df = listings_df(30, 0);
    let outcome = Pipeline::default().run(&df, Transmission::Manual).unwrap();

    let by_index: std::collections::HashMap<usize, f64> = outcome
        .table
        .predictions
        .iter()
        .map(|p| (p.row_index, p.residual))
        .collect();

    let residuals: Vec<f64> = outcome
        .picks
        .row_indices()
        .iter()
        .map(|i| by_index[i])
        .collect();
    for pair in residuals.windows(2) {
        assert!(
            pair[0] >= pair[1],
            "picks not sorted by residual: {residuals:?}"
        );
    }
}

#[test]
fn test_mae_covers_every_scored_listing() {
    let df = listings_df(30, 0);
    let outcome = Pipeline::default().run(&df, Transmission::Manual).unwrap();
    let table = &outcome.table;

    assert_eq!(table.predictions.len(), 30);

    let expected = table
        .predictions
        .iter()
        .map(|p| (p.predicted - p.actual).abs())
        .sum::<f64>()
        / table.predictions.len() as f64;
    assert!((table.mae - expected).abs() < 1e-9);

    for p in &table.predictions {
        assert_eq!(p.residual, p.predicted - p.actual);
    }
}

#[test]
fn test_pipeline_is_deterministic() {
    let df = listings_df(30, 0);
    let pipeline = Pipeline::default();

    let a = pipeline.run(&df, Transmission::Manual).unwrap();
    let b = pipeline.run(&df, Transmission::Manual).unwrap();

    assert_eq!(a.selected.candidate.family, b.selected.candidate.family);
    assert_eq!(a.selected.candidate.params, b.selected.candidate.params);
    assert_eq!(a.picks.names(), b.picks.names());
    assert_eq!(a.picks.row_indices(), b.picks.row_indices());
    assert_eq!(a.table.mae, b.table.mae);
}

// Scenario B: noiseless linear data must crown the linear family with a
// holdout score of ~1 and no overfit flag.
#[test]
fn test_noiseless_linear_data_selects_linear_family() {
    init_tracing();
    let df = noiseless_linear_df();
    let outcome = Pipeline::default().run(&df, Transmission::Manual).unwrap();

    let candidate = &outcome.selected.candidate;
    assert_eq!(candidate.family, ModelFamily::Linear);
    assert!(
        candidate.holdout_score > 0.999,
        "holdout score {} should be ~1",
        candidate.holdout_score
    );
    assert!(!candidate.overfit);
    assert!(!outcome.selected.degraded);

    // Exact linear pricing leaves residuals near zero everywhere.
    assert!(outcome.table.mae < 1.0, "MAE {} should be ~0", outcome.table.mae);
}

// Scenario A: requesting one transmission type scores only its rows.
#[test]
fn test_scoring_scopes_to_requested_transmission() {
    let df = listings_df(3, 2);

    // Train a simple model on the two automatic rows directly; the search
    // itself needs more rows than this slice has.
    let features = features_for(&df, Transmission::Automatic).unwrap();
    let mut lr = LinearRegression::new();
    lr.fit(&features.x, &features.y).unwrap();

    let selected = SelectedModel {
        candidate: ModelCandidate {
            family: ModelFamily::Linear,
            params: TunedParams::Linear,
            model: Regressor::Linear(lr),
            cv_score: None,
            train_score: 1.0,
            holdout_score: 1.0,
            overfit: false,
        },
        degraded: false,
    };

    let table = Pipeline::default()
        .score(&df, Transmission::Automatic, &selected)
        .unwrap();

    assert_eq!(table.predictions.len(), 2);
    let indices: Vec<usize> = table.predictions.iter().map(|p| p.row_index).collect();
    assert_eq!(indices, vec![3, 4]);

    let picks = rank_underpriced(&table, 5);
    assert_eq!(picks.len(), 2);
}

// Scenario D: three listings of one type rank to all three, no error.
#[test]
fn test_ranking_three_listings_returns_three() {
    let predictions = vec![
        ("FORD Fiesta", 0usize, 8_000.0, 8_900.0),
        ("RENAULT Zoe", 1, 11_000.0, 10_500.0),
        ("MINI Cooper", 2, 15_000.0, 17_000.0),
    ];
    let table = PredictionTable {
        predictions: predictions
            .into_iter()
            .map(|(name, idx, actual, predicted)| argus::pipeline::Prediction {
                name: name.to_string(),
                reference: format!("REF-{idx}"),
                row_index: idx,
                actual,
                predicted,
                residual: predicted - actual,
            })
            .collect(),
        mae: 0.0,
    };

    let picks = rank_underpriced(&table, 5);
    assert_eq!(picks.len(), 3);
    assert_eq!(picks.names(), vec!["MINI Cooper", "FORD Fiesta", "RENAULT Zoe"]);
}

// Scenario C: universal overfitting falls back to the best holdout score
// instead of erroring.
#[test]
fn test_universal_overfitting_degrades_instead_of_failing() {
    let mut lr = LinearRegression::new();
    lr.fit(
        &ndarray::array![[1.0], [2.0], [3.0]],
        &Array1::from_vec(vec![1.0, 2.0, 3.0]),
    )
    .unwrap();

    let candidate = |family, train: f64, holdout: f64| ModelCandidate {
        family,
        params: TunedParams::Linear,
        model: Regressor::Linear(lr.clone()),
        cv_score: None,
        train_score: train,
        holdout_score: holdout,
        overfit: is_overfit(train, holdout),
    };

    let candidates = vec![
        candidate(ModelFamily::NearestNeighbors, 0.95, 0.1),
        candidate(ModelFamily::TreeEnsemble, 0.99, 0.45),
        candidate(ModelFamily::MarginRegression, 0.9, 0.2),
        candidate(ModelFamily::Linear, 0.98, 0.3),
    ];
    assert!(candidates.iter().all(|c| c.overfit));

    let selected = select_best(candidates).unwrap();
    assert!(selected.degraded);
    assert_eq!(selected.candidate.family, ModelFamily::TreeEnsemble);
}

#[test]
fn test_empty_partition_is_fatal() {
    let df = listings_df(6, 0);
    let err = select_underpriced(&df, Transmission::Automatic);
    assert!(matches!(err, Err(ArgusError::ValidationError(_))));
}

#[test]
fn test_too_few_rows_for_cross_validation_is_fatal() {
    // Five manual rows: the 80/20 split leaves four train rows, one short of
    // the five folds the grids validate against.
    let df = listings_df(5, 0);
    let err = select_underpriced(&df, Transmission::Manual);
    assert!(matches!(err, Err(ArgusError::ValidationError(_))));
}

#[test]
fn test_outcome_carries_candidate_scores() {
    let df = listings_df(30, 0);
    let outcome = Pipeline::default().run(&df, Transmission::Manual).unwrap();

    let c = &outcome.selected.candidate;
    assert!(c.train_score <= 1.0);
    assert!(c.holdout_score <= 1.0);
    assert_eq!(c.overfit, is_overfit(c.train_score, c.holdout_score));
}
