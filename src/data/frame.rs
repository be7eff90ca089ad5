//! Typed, immutable model frames

use crate::error::{BurnwiseError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Values of one predictor column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named predictor column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl FeatureColumn {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Categorical(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.values, ColumnValues::Categorical(_))
    }

    fn take(&self, indices: &[usize]) -> Self {
        let values = match &self.values {
            ColumnValues::Numeric(v) => ColumnValues::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnValues::Categorical(v) => {
                ColumnValues::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        };
        Self {
            name: self.name.clone(),
            values,
        }
    }
}

/// Target vector plus predictor columns, all of equal length.
///
/// Frames are never mutated after construction; subsetting returns a new frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFrame {
    target_name: String,
    target: Array1<f64>,
    columns: Vec<FeatureColumn>,
}

impl ModelFrame {
    pub fn new(
        target_name: impl Into<String>,
        target: Vec<f64>,
        columns: Vec<FeatureColumn>,
    ) -> Result<Self> {
        let n = target.len();
        if let Some(bad) = columns.iter().find(|c| c.len() != n) {
            return Err(BurnwiseError::ShapeError {
                expected: format!("{} rows in column '{}'", n, bad.name),
                actual: format!("{} rows", bad.len()),
            });
        }
        Ok(Self {
            target_name: target_name.into(),
            target: Array1::from_vec(target),
            columns,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn predictor_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// New frame holding the given rows, in the given order
    pub fn take(&self, indices: &[usize]) -> ModelFrame {
        ModelFrame {
            target_name: self.target_name.clone(),
            target: indices.iter().map(|&i| self.target[i]).collect(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
        }
    }
}
