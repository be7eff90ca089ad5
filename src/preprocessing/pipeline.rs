//! Fit-on-train, apply-anywhere feature preprocessing

use super::encoder::{Encoded, OneHotEncoder};
use super::scaler::ScalerParams;
use crate::data::{ColumnValues, FeatureColumn, ModelFrame};
use crate::error::{BurnwiseError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Preprocessing policy. Fitting yields a [`FittedPreprocessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preprocessor {
    strict_categories: bool,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Preprocessor {
    pub fn new(strict_categories: bool) -> Self {
        Self { strict_categories }
    }

    pub fn strict_categories(&self) -> bool {
        self.strict_categories
    }

    /// Learn scaling and encoding parameters from `frame` alone
    pub fn fit(&self, frame: &ModelFrame) -> Result<FittedPreprocessor> {
        if frame.n_rows() == 0 {
            return Err(BurnwiseError::InsufficientData {
                component: "Preprocessor",
                required: 1,
                actual: 0,
            });
        }

        let transforms: Vec<ColumnTransform> = frame
            .columns()
            .iter()
            .map(|column| match &column.values {
                ColumnValues::Numeric(values) => ColumnTransform::Standardize {
                    column: column.name.clone(),
                    params: ScalerParams::fit(values),
                },
                ColumnValues::Categorical(values) => {
                    ColumnTransform::OneHot(OneHotEncoder::fit(column.name.clone(), values))
                }
            })
            .collect();

        let feature_names = transforms.iter().flat_map(ColumnTransform::output_names).collect();

        Ok(FittedPreprocessor {
            transforms,
            feature_names,
            strict_categories: self.strict_categories,
        })
    }
}

/// Per-column fitted transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnTransform {
    Standardize { column: String, params: ScalerParams },
    OneHot(OneHotEncoder),
}

impl ColumnTransform {
    fn column(&self) -> &str {
        match self {
            ColumnTransform::Standardize { column, .. } => column,
            ColumnTransform::OneHot(enc) => enc.column(),
        }
    }

    fn n_outputs(&self) -> usize {
        match self {
            ColumnTransform::Standardize { .. } => 1,
            ColumnTransform::OneHot(enc) => enc.n_outputs(),
        }
    }

    fn output_names(&self) -> Vec<String> {
        match self {
            ColumnTransform::Standardize { column, .. } => vec![column.clone()],
            ColumnTransform::OneHot(enc) => enc.output_names(),
        }
    }
}

/// Frozen preprocessing state of one training partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    transforms: Vec<ColumnTransform>,
    feature_names: Vec<String>,
    strict_categories: bool,
}

impl FittedPreprocessor {
    /// Names of the design-matrix columns, in order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Scaling parameters learned for a numeric column
    pub fn scaler_params(&self, column: &str) -> Option<&ScalerParams> {
        self.transforms.iter().find_map(|t| match t {
            ColumnTransform::Standardize { column: c, params } if c == column => Some(params),
            _ => None,
        })
    }

    /// Encoder learned for a categorical column
    pub fn encoder(&self, column: &str) -> Option<&OneHotEncoder> {
        self.transforms.iter().find_map(|t| match t {
            ColumnTransform::OneHot(enc) if enc.column() == column => Some(enc),
            _ => None,
        })
    }

    /// Build the design matrix for `frame` using the stored parameters only
    pub fn transform(&self, frame: &ModelFrame) -> Result<Array2<f64>> {
        let n = frame.n_rows();
        let mut x = Array2::zeros((n, self.n_features()));
        let mut offset = 0;
        let mut unknown = 0usize;

        for transform in &self.transforms {
            let column = lookup(frame, transform.column())?;
            let width = transform.n_outputs();

            match (transform, &column.values) {
                (ColumnTransform::Standardize { params, .. }, ColumnValues::Numeric(values)) => {
                    for (row, &v) in values.iter().enumerate() {
                        x[[row, offset]] = params.apply(v);
                    }
                }
                (ColumnTransform::OneHot(enc), ColumnValues::Categorical(values)) => {
                    let mut buf = vec![0.0; width];
                    for (row, v) in values.iter().enumerate() {
                        if enc.encode_into(v, &mut buf, self.strict_categories)? == Encoded::Unknown {
                            unknown += 1;
                        }
                        for (j, &b) in buf.iter().enumerate() {
                            x[[row, offset + j]] = b;
                        }
                    }
                }
                _ => {
                    return Err(BurnwiseError::SchemaError {
                        component: "Preprocessor",
                        column: column.name.clone(),
                        reason: "column kind differs from the one seen during fit".to_string(),
                    })
                }
            }
            offset += width;
        }

        if unknown > 0 {
            tracing::warn!(rows = unknown, "Unseen categories encoded as unknown");
        }
        Ok(x)
    }
}

fn lookup<'a>(frame: &'a ModelFrame, name: &str) -> Result<&'a FeatureColumn> {
    frame.column(name).ok_or_else(|| BurnwiseError::SchemaError {
        component: "Preprocessor",
        column: name.to_string(),
        reason: "column seen during fit is missing".to_string(),
    })
}
