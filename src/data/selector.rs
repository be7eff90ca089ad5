//! Projection of the cleaned dataset onto target and predictors

use super::frame::{FeatureColumn, ModelFrame};
use crate::config::{PipelineConfig, DEFAULT_PREDICTORS, DEFAULT_TARGET};
use crate::error::{BurnwiseError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Target column plus ordered predictor whitelist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    target: String,
    predictors: Vec<String>,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            predictors: DEFAULT_PREDICTORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FeatureSpec {
    /// Create a spec; the target may not appear among the predictors
    pub fn new<S: AsRef<str>>(target: impl Into<String>, predictors: &[S]) -> Result<Self> {
        let target = target.into();
        let predictors: Vec<String> = predictors.iter().map(|p| p.as_ref().to_string()).collect();

        if predictors.is_empty() {
            return Err(BurnwiseError::ConfigError("predictor list is empty".into()));
        }
        if predictors.contains(&target) {
            return Err(BurnwiseError::ConfigError(format!(
                "target '{}' is also listed as a predictor",
                target
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = predictors.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(BurnwiseError::ConfigError(format!(
                "predictor '{}' listed twice",
                dup
            )));
        }

        Ok(Self { target, predictors })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.target.clone(), &config.predictors)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }
}

/// Builds a [`ModelFrame`] from a polars DataFrame
#[derive(Debug, Clone)]
pub struct FeatureSelector {
    spec: FeatureSpec,
}

impl FeatureSelector {
    pub fn new(spec: FeatureSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    /// Extract target and predictors, preserving row order.
    ///
    /// Numeric columns of any integer or float width are widened to `f64`;
    /// string columns become categorical predictors.
    pub fn select(&self, df: &DataFrame) -> Result<ModelFrame> {
        let target = numeric_values(df, &self.spec.target)?;

        let columns = self
            .spec
            .predictors
            .iter()
            .map(|name| {
                let column = lookup(df, name)?;
                let dtype = column.dtype().clone();
                if is_numeric(&dtype) {
                    Ok(FeatureColumn::numeric(name.clone(), numeric_values(df, name)?))
                } else if dtype == DataType::String {
                    Ok(FeatureColumn::categorical(name.clone(), string_values(df, name)?))
                } else {
                    Err(BurnwiseError::SchemaError {
                        component: "FeatureSelector",
                        column: name.clone(),
                        reason: format!("unsupported dtype {}", dtype),
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            rows = df.height(),
            predictors = columns.len(),
            target_column = %self.spec.target,
            "Selected modeling columns"
        );

        ModelFrame::new(self.spec.target.clone(), target, columns)
    }
}

pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn lookup<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name).map_err(|_| BurnwiseError::SchemaError {
        component: "FeatureSelector",
        column: name.to_string(),
        reason: "column not found".to_string(),
    })
}

fn missing_value(name: &str, row: usize) -> BurnwiseError {
    BurnwiseError::SchemaError {
        component: "FeatureSelector",
        column: name.to_string(),
        reason: format!("missing value at row {}", row),
    }
}

fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = lookup(df, name)?;
    if !is_numeric(column.dtype()) {
        return Err(BurnwiseError::SchemaError {
            component: "FeatureSelector",
            column: name.to_string(),
            reason: format!("expected a numeric column, found {}", column.dtype()),
        });
    }

    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| missing_value(name, row)))
        .collect()
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = lookup(df, name)?;
    column
        .as_materialized_series()
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.map(str::to_string).ok_or_else(|| missing_value(name, row)))
        .collect()
}
