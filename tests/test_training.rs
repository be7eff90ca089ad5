//! Integration test: model families, trainer and cross-validation

use burnwise::config::RegularizationGrid;
use burnwise::data::{FeatureColumn, ModelFrame};
use burnwise::error::{BurnwiseError, PipelineWarning};
use burnwise::training::{
    CrossValidator, GbtConfig, ModelFamily, ModelTrainer, ModelVariant,
};

fn sessions(n: usize) -> ModelFrame {
    let duration: Vec<f64> = (0..n).map(|i| 0.5 + ((i * 7) % 20) as f64 * 0.075).collect();
    let bpm: Vec<f64> = (0..n).map(|i| 110.0 + ((i * 13) % 61) as f64).collect();
    let gender: Vec<&str> = (0..n)
        .map(|i| if (i * 5) % 3 == 0 { "Female" } else { "Male" })
        .collect();
    let target: Vec<f64> = (0..n)
        .map(|i| 10.0 * duration[i] + 5.0 * bpm[i] + ((i * 11) % 9) as f64 - 4.0)
        .collect();
    ModelFrame::new(
        "Calories_Burned",
        target,
        vec![
            FeatureColumn::numeric("Session_Duration", duration),
            FeatureColumn::numeric("Avg_BPM", bpm),
            FeatureColumn::categorical("Gender", gender),
        ],
    )
    .unwrap()
}

#[test]
fn test_ten_folds_of_fifty_rows() {
    let cv = CrossValidator::new(10, 42);
    let splits = cv.k_fold_split(50).unwrap();

    assert_eq!(splits.len(), 10);
    let mut held_out: Vec<usize> = Vec::new();
    for split in &splits {
        assert_eq!(split.test_indices.len(), 5);
        assert_eq!(split.train_indices.len(), 45);
        assert!(split.test_indices.iter().all(|i| !split.train_indices.contains(i)));
        held_out.extend(&split.test_indices);
    }
    held_out.sort_unstable();
    assert_eq!(held_out, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_folds_need_enough_rows() {
    let err = CrossValidator::new(10, 0).k_fold_split(9).unwrap_err();
    assert!(matches!(err, BurnwiseError::InsufficientData { .. }));
}

#[test]
fn test_grid_search_scores_every_candidate() {
    let frame = sessions(60);
    let grid = RegularizationGrid {
        n_lambdas: 5,
        ..Default::default()
    };
    let candidates = ModelFamily::Ridge.candidates(&grid, &GbtConfig::default());
    let result = CrossValidator::new(5, 43)
        .grid_search(&frame, ModelFamily::Ridge, &candidates)
        .unwrap();

    assert_eq!(result.candidates.len(), 5);
    assert!(result.candidates.iter().all(|c| c.results.n_folds == 5));
    let min = result
        .candidates
        .iter()
        .map(|c| c.results.mean_score)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(result.best_score, min);
    assert!(candidates.contains(&result.best));
}

#[test]
fn test_grid_search_is_deterministic() {
    let frame = sessions(60);
    let grid = RegularizationGrid {
        n_lambdas: 4,
        ..Default::default()
    };
    let candidates = ModelFamily::ElasticNet.candidates(&grid, &GbtConfig::default());
    let a = CrossValidator::new(5, 7)
        .grid_search(&frame, ModelFamily::ElasticNet, &candidates)
        .unwrap();
    let b = CrossValidator::new(5, 7)
        .grid_search(&frame, ModelFamily::ElasticNet, &candidates)
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.candidates.len(), 10);
}

#[test]
fn test_all_constant_folds_is_an_error() {
    let n = 20;
    let frame = ModelFrame::new(
        "Calories_Burned",
        vec![500.0; n],
        vec![FeatureColumn::numeric("Avg_BPM", (0..n).map(|i| i as f64).collect())],
    )
    .unwrap();
    let candidates = vec![ModelVariant::Ridge { lambda: 0.1 }];
    let err = CrossValidator::new(5, 1)
        .grid_search(&frame, ModelFamily::Ridge, &candidates)
        .unwrap_err();
    assert!(matches!(err, BurnwiseError::DegenerateFold { .. }));
}

#[test]
fn test_huge_lasso_penalty_predicts_the_mean() {
    let frame = sessions(40);
    let trained = ModelTrainer::default()
        .fit(&frame, &ModelVariant::Lasso { lambda: 1e6 })
        .unwrap();
    let preds = trained.predict(&frame).unwrap();
    let mean = frame.target().mean().unwrap();

    assert!(trained.outcome().converged);
    assert!(preds.iter().all(|p| (p - mean).abs() < 1e-9));
}

#[test]
fn test_ridge_shrinks_toward_the_mean() {
    let frame = sessions(40);
    let trainer = ModelTrainer::default();
    let ols = trainer.fit(&frame, &ModelVariant::Ols).unwrap();
    let ridge = trainer.fit(&frame, &ModelVariant::Ridge { lambda: 10.0 }).unwrap();

    let spread = |p: ndarray::Array1<f64>| {
        let m = p.mean().unwrap();
        p.iter().map(|v| (v - m).powi(2)).sum::<f64>()
    };
    assert!(spread(ridge.predict(&frame).unwrap()) < spread(ols.predict(&frame).unwrap()));
}

#[test]
fn test_tiny_budget_reports_non_convergence() {
    let frame = sessions(40);
    let trainer = ModelTrainer::default().with_solver(burnwise::config::SolverConfig {
        max_iter: 1,
        tol: 1e-12,
    });
    let trained = trainer
        .fit(&frame, &ModelVariant::Lasso { lambda: 1e-4 })
        .unwrap();
    assert!(!trained.outcome().converged);
    assert_eq!(trained.outcome().iterations, 1);
}

#[test]
fn test_cv_aggregates_convergence_warnings() {
    let frame = sessions(40);
    let trainer = ModelTrainer::default().with_solver(burnwise::config::SolverConfig {
        max_iter: 1,
        tol: 1e-12,
    });
    let candidates = vec![ModelVariant::Lasso { lambda: 1e-4 }];
    let result = CrossValidator::new(4, 3)
        .with_trainer(trainer)
        .grid_search(&frame, ModelFamily::Lasso, &candidates)
        .unwrap();

    let convergence: Vec<&PipelineWarning> = result
        .warnings
        .iter()
        .filter(|w| matches!(w, PipelineWarning::ConvergenceWarning { .. }))
        .collect();
    assert_eq!(convergence.len(), 1);
    assert!(convergence[0].to_string().contains("4 of 4"));
}

#[test]
fn test_gbt_reproducible_with_seed() {
    let frame = sessions(60);
    let variant = ModelVariant::GradientBoostedTrees(
        GbtConfig::default().with_iterations(60).with_depth(4).with_random_state(11),
    );
    let trainer = ModelTrainer::default();
    let a = trainer.fit(&frame, &variant).unwrap().predict(&frame).unwrap();
    let b = trainer.fit(&frame, &variant).unwrap().predict(&frame).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_gbt_importances_favour_informative_feature() {
    let frame = sessions(80);
    let trained = ModelTrainer::default()
        .fit(
            &frame,
            &ModelVariant::GradientBoostedTrees(
                GbtConfig::default().with_iterations(80).with_depth(3).with_random_state(2),
            ),
        )
        .unwrap();
    let importances = trained.feature_importances().unwrap();
    assert_eq!(importances[0].0, "Avg_BPM");
    let total: f64 = importances.iter().map(|(_, v)| v).sum();
    assert!((total - 1.0).abs() < 1e-9);
}
