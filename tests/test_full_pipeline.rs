//! Integration test: full pipeline from session table to report

use burnwise::config::PipelineConfig;
use burnwise::data::{FeatureColumn, ModelFrame, Partitioner};
use burnwise::error::{BurnwiseError, PipelineWarning};
use burnwise::pipeline::{Pipeline, PipelineRun};
use burnwise::report::PipelineReport;
use burnwise::training::{GbtConfig, ModelFamily};
use polars::prelude::*;

/// 100 sessions with `Calories_Burned = 10 * Session_Duration + 5 * Avg_BPM`
fn exact_sessions() -> DataFrame {
    let n = 100;
    let duration: Vec<f64> = (0..n).map(|i| 0.5 + ((i * 7) % 20) as f64 * 0.075).collect();
    let bpm: Vec<f64> = (0..n).map(|i| 110.0 + ((i * 13) % 61) as f64).collect();
    let gender: Vec<&str> = (0..n)
        .map(|i| if (i * 5) % 3 == 0 { "Female" } else { "Male" })
        .collect();
    let workout: Vec<&str> = (0..n)
        .map(|i| ["Cardio", "HIIT", "Strength", "Yoga"][(i * 3) % 4])
        .collect();
    let calories: Vec<f64> = (0..n).map(|i| 10.0 * duration[i] + 5.0 * bpm[i]).collect();

    df!(
        "Session_Duration" => &duration,
        "Avg_BPM" => &bpm,
        "Gender" => &gender,
        "Workout_Type" => &workout,
        "Calories_Burned" => &calories
    )
    .unwrap()
}

fn config() -> PipelineConfig {
    PipelineConfig::default().with_predictors(&["Session_Duration", "Avg_BPM", "Gender"])
}

#[test]
fn test_recovers_exact_linear_relationship() {
    let run = Pipeline::new(config()).unwrap().run(&exact_sessions()).unwrap();
    let report = &run.report;

    assert_eq!(report.split.n_train, 80);
    assert_eq!(report.split.n_test, 20);
    assert_eq!(report.metrics.len(), 5);

    let ols = report.metrics_for("OLS").unwrap();
    assert!(ols.rmse < 1e-6, "OLS RMSE {}", ols.rmse);

    let gbt = report.metrics_for("GradientBoostedTrees").unwrap();
    assert!(gbt.r2 > 0.85, "GBT R² {}", gbt.r2);

    assert!(report.best_model.rmse <= ols.rmse);
    assert!(report.best_model.rmse < 1e-6);

    // Tuned families carry their CV summary
    let tuned: Vec<ModelFamily> = report.cross_validation.iter().map(|c| c.family).collect();
    assert_eq!(
        tuned,
        vec![ModelFamily::Ridge, ModelFamily::Lasso, ModelFamily::ElasticNet]
    );
    assert_eq!(report.cross_validation[0].candidates.len(), 20);
    assert_eq!(report.cross_validation[2].candidates.len(), 10);

    // Residual table covers exactly the test rows
    let rows: Vec<usize> = report.residuals.records.iter().map(|r| r.row).collect();
    assert_eq!(rows, run.split.test_indices);
}

#[test]
fn test_same_seed_same_report() {
    let df = exact_sessions();
    let config = config()
        .with_gbt(GbtConfig::default().with_iterations(100))
        .with_seed(9);
    let a = Pipeline::new(config.clone()).unwrap().run(&df).unwrap();
    let b = Pipeline::new(config).unwrap().run(&df).unwrap();

    assert_eq!(a.split, b.split);
    assert_eq!(a.report.metrics, b.report.metrics);
    assert_eq!(a.report.cross_validation, b.report.cross_validation);
    assert_eq!(a.report.residuals, b.report.residuals);
}

fn run_with_threads(threads: usize, config: &PipelineConfig, df: &DataFrame) -> PipelineRun {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .unwrap();
    pool.install(|| Pipeline::new(config.clone()).unwrap().run(df).unwrap())
}

#[test]
fn test_results_independent_of_thread_count() {
    let df = exact_sessions();
    let config = config()
        .with_gbt(GbtConfig::default().with_iterations(80).with_depth(4))
        .with_seed(21);

    let single = run_with_threads(1, &config, &df);
    let many = run_with_threads(8, &config, &df);

    assert_eq!(single.split, many.split);
    assert_eq!(single.report.metrics, many.report.metrics);
    assert_eq!(single.report.cross_validation, many.report.cross_validation);
    assert_eq!(single.report.best_model, many.report.best_model);
    assert_eq!(single.report.residuals, many.report.residuals);
}

#[test]
fn test_convergence_warnings_reach_metrics_and_report() {
    let config = config()
        .with_models(&[ModelFamily::Ols, ModelFamily::Lasso])
        .with_solver(1, 1e-12);
    let report = Pipeline::new(config).unwrap().run(&exact_sessions()).unwrap().report;

    let lasso = report.metrics_for("Lasso").unwrap();
    assert!(lasso
        .warnings
        .iter()
        .any(|w| matches!(w, PipelineWarning::ConvergenceWarning { .. })));
    assert!(report.metrics_for("OLS").unwrap().warnings.is_empty());

    let final_refit = report.warnings.iter().any(|w| {
        matches!(w, PipelineWarning::ConvergenceWarning { model, context, .. }
            if model == "Lasso" && context.starts_with("final refit"))
    });
    assert!(final_refit, "{:?}", report.warnings);
    assert_eq!(report.warnings.len(), lasso.warnings.len());
}

#[test]
fn test_degenerate_folds_reported_as_warnings() {
    let n = 50;
    let config = PipelineConfig::default()
        .with_predictors(&["Session_Duration", "Avg_BPM"])
        .with_models(&[ModelFamily::Ridge])
        .with_folds(5)
        .with_seed(4);
    let sessions = |target: Vec<f64>| {
        ModelFrame::new(
            "Calories_Burned",
            target,
            vec![
                FeatureColumn::numeric(
                    "Session_Duration",
                    (0..n).map(|i| 0.5 + (i % 7) as f64 * 0.2).collect(),
                ),
                FeatureColumn::numeric("Avg_BPM", (0..n).map(|i| 110.0 + (i % 11) as f64).collect()),
            ],
        )
        .unwrap()
    };

    // constant target except for one training row: only that row's fold has variance
    let mut target = vec![600.0; n];
    let split = Partitioner::from_config(&config)
        .split(&ndarray::Array1::from(target.clone()))
        .unwrap();
    target[split.train_indices[0]] = 750.0;

    let run = Pipeline::new(config).unwrap().run_frame(&sessions(target)).unwrap();
    assert_eq!(run.split, split);

    let degenerate: Vec<&PipelineWarning> = run
        .report
        .warnings
        .iter()
        .filter(|w| matches!(w, PipelineWarning::DegenerateFold { .. }))
        .collect();
    assert_eq!(degenerate.len(), 4);
    assert_eq!(run.report.cross_validation[0].candidates[0].folds_scored, 1);
    assert_eq!(run.report.metrics_for("Ridge").unwrap().warnings.len(), 4);
}

#[test]
fn test_different_seed_different_split() {
    let df = exact_sessions();
    let linear = [ModelFamily::Ols];
    let a = Pipeline::new(config().with_models(&linear).with_seed(1))
        .unwrap()
        .run(&df)
        .unwrap();
    let b = Pipeline::new(config().with_models(&linear).with_seed(2))
        .unwrap()
        .run(&df)
        .unwrap();
    assert_ne!(a.split.test_indices, b.split.test_indices);
}

#[test]
fn test_rare_category_strict_vs_lenient() {
    let mut df = exact_sessions();
    let mut workout: Vec<String> = df
        .column("Workout_Type")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();
    workout[17] = "Pilates".to_string();
    df.with_column(Series::new("Workout_Type".into(), workout))
        .unwrap();

    let predictors = ["Session_Duration", "Avg_BPM", "Workout_Type"];
    let families = [ModelFamily::Ols, ModelFamily::Ridge];

    let strict = Pipeline::new(config().with_predictors(&predictors).with_models(&families))
        .unwrap()
        .run(&df);
    assert!(matches!(strict, Err(BurnwiseError::UnseenCategory { ref value, .. }) if value == "Pilates"));

    let lenient = Pipeline::new(
        config()
            .with_predictors(&predictors)
            .with_models(&families)
            .with_strict_categories(false),
    )
    .unwrap()
    .run(&df);
    assert!(lenient.is_ok(), "{:?}", lenient.err());
}

#[test]
fn test_missing_predictor_aborts_run() {
    let err = Pipeline::new(config().with_predictors(&["Session_Duration", "Max_BPM"]))
        .unwrap()
        .run(&exact_sessions())
        .unwrap_err();
    assert_eq!(err.component(), "FeatureSelector");
}

#[test]
fn test_report_round_trips_through_json() {
    let config = config().with_models(&[ModelFamily::Ols, ModelFamily::Lasso]);
    let run = Pipeline::new(config).unwrap().run(&exact_sessions()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    run.report.save(&path).unwrap();

    let loaded = PipelineReport::load(&path).unwrap();
    assert_eq!(loaded.best_model.model, run.report.best_model.model);
    assert_eq!(loaded.metrics.len(), 2);
    assert_eq!(loaded.residuals.records.len(), 20);
    assert_eq!(loaded.config, run.report.config);
    assert!(run.report.to_text().contains("Test Metrics"));
}

#[test]
fn test_config_file_fills_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("burnwise.json");
    std::fs::write(&path, r#"{ "seed": 7, "cv": { "n_folds": 5 } }"#).unwrap();

    let config = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.cv.n_folds, 5);
    assert_eq!(config.split.train_fraction, 0.8);
    assert_eq!(config.models.len(), 5);

    std::fs::write(&path, r#"{ "cv": { "n_folds": 1 } }"#).unwrap();
    assert!(PipelineConfig::from_json_file(&path).is_err());
}
