//! Integration test: feature selection and partitioning

use burnwise::config::PipelineConfig;
use burnwise::data::{ColumnValues, FeatureSelector, FeatureSpec, Partitioner};
use burnwise::error::BurnwiseError;
use polars::prelude::*;

fn sessions_df(n: usize) -> DataFrame {
    let age: Vec<i64> = (0..n).map(|i| 18 + (i * 7 % 40) as i64).collect();
    let gender: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "Male" } else { "Female" }).collect();
    let weight: Vec<f64> = (0..n).map(|i| 50.0 + (i * 11 % 45) as f64).collect();
    let height: Vec<f64> = (0..n).map(|i| 1.55 + (i % 9) as f64 * 0.05).collect();
    let duration: Vec<f64> = (0..n).map(|i| 0.5 + (i * 3 % 16) as f64 * 0.1).collect();
    let bpm: Vec<i64> = (0..n).map(|i| 115 + (i * 13 % 50) as i64).collect();
    let workout: Vec<&str> = (0..n)
        .map(|i| ["Cardio", "HIIT", "Strength", "Yoga"][i % 4])
        .collect();
    let calories: Vec<f64> = (0..n)
        .map(|i| duration[i] * bpm[i] as f64 * 6.0 + (i % 5) as f64)
        .collect();

    df!(
        "Age" => &age,
        "Gender" => &gender,
        "Weight" => &weight,
        "Height" => &height,
        "Session_Duration" => &duration,
        "Avg_BPM" => &bpm,
        "Workout_Type" => &workout,
        "Calories_Burned" => &calories
    )
    .unwrap()
}

#[test]
fn test_selection_keeps_only_whitelisted_predictors() {
    let df = sessions_df(30);
    let spec = FeatureSpec::new("Calories_Burned", &["Avg_BPM", "Gender", "Session_Duration"]).unwrap();
    let frame = FeatureSelector::new(spec).select(&df).unwrap();

    assert_eq!(frame.n_rows(), 30);
    assert_eq!(frame.predictor_names(), vec!["Avg_BPM", "Gender", "Session_Duration"]);
    assert!(frame.column("Height").is_none());
    assert!(frame.column("Gender").unwrap().is_categorical());

    // Integer columns are widened, not rejected
    match &frame.column("Avg_BPM").unwrap().values {
        ColumnValues::Numeric(v) => assert_eq!(v[1], 128.0),
        other => panic!("expected numeric Avg_BPM, got {:?}", other),
    }
    assert_eq!(frame.target()[0], 0.5 * 115.0 * 6.0);
}

#[test]
fn test_selection_missing_column_is_schema_error() {
    let df = sessions_df(10);
    let spec = FeatureSpec::new("Calories_Burned", &["Avg_BPM", "Fat_Percentage"]).unwrap();
    let err = FeatureSelector::new(spec).select(&df).unwrap_err();

    assert!(matches!(err, BurnwiseError::SchemaError { ref column, .. } if column == "Fat_Percentage"));
    assert_eq!(err.component(), "FeatureSelector");
}

#[test]
fn test_selection_rejects_non_numeric_target() {
    let df = sessions_df(10);
    let spec = FeatureSpec::new("Gender", &["Avg_BPM"]).unwrap();
    let err = FeatureSelector::new(spec).select(&df).unwrap_err();
    assert!(matches!(err, BurnwiseError::SchemaError { .. }));
}

#[test]
fn test_split_is_a_partition_of_all_rows() {
    let df = sessions_df(97);
    let frame = FeatureSelector::new(FeatureSpec::new("Calories_Burned", &["Avg_BPM"]).unwrap())
        .select(&df)
        .unwrap();
    let split = Partitioner::new(0.8, 42).split(frame.target()).unwrap();

    assert_eq!(split.n_train(), 78);
    assert_eq!(split.n_test(), 19);

    let mut all: Vec<usize> = split
        .train_indices
        .iter()
        .chain(split.test_indices.iter())
        .copied()
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..97).collect::<Vec<_>>());
    assert!(split.train_indices.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_split_reproducible_by_seed() {
    let df = sessions_df(60);
    let frame = FeatureSelector::new(FeatureSpec::new("Calories_Burned", &["Avg_BPM"]).unwrap())
        .select(&df)
        .unwrap();

    let a = Partitioner::new(0.7, 42).split(frame.target()).unwrap();
    let b = Partitioner::new(0.7, 42).split(frame.target()).unwrap();
    let c = Partitioner::new(0.7, 43).split(frame.target()).unwrap();

    assert_eq!(a, b);
    assert_ne!(a.train_indices, c.train_indices);
    assert_eq!(a.n_train(), 42);
}

#[test]
fn test_stratified_split_keeps_exact_size() {
    let df = sessions_df(101);
    let frame = FeatureSelector::new(FeatureSpec::new("Calories_Burned", &["Avg_BPM"]).unwrap())
        .select(&df)
        .unwrap();
    let split = Partitioner::new(0.8, 5)
        .with_stratify(true)
        .split(frame.target())
        .unwrap();

    assert_eq!(split.n_train(), 81);
    assert_eq!(split.n_test(), 20);
}

#[test]
fn test_split_requires_two_rows_per_fold() {
    let df = sessions_df(19);
    let frame = FeatureSelector::new(FeatureSpec::new("Calories_Burned", &["Avg_BPM"]).unwrap())
        .select(&df)
        .unwrap();
    let err = Partitioner::from_config(&PipelineConfig::default())
        .split(frame.target())
        .unwrap_err();

    assert!(matches!(
        err,
        BurnwiseError::InsufficientData { component: "Partitioner", required: 20, actual: 19 }
    ));
}
