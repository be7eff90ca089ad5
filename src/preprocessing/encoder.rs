//! Dummy (treatment) coding of categorical predictors

use crate::error::{BurnwiseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder that drops the first (reference) level.
///
/// Levels are the sorted set of values seen during fit. The reference level
/// encodes as all zeros, which keeps the design matrix full rank next to an
/// intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    column: String,
    categories: Vec<String>,
}

/// Outcome of encoding a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded {
    Known,
    Unknown,
}

impl OneHotEncoder {
    pub fn fit(column: impl Into<String>, values: &[String]) -> Self {
        let categories: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        Self {
            column: column.into(),
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn reference(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Number of output columns (levels minus the reference)
    pub fn n_outputs(&self) -> usize {
        self.categories.len().saturating_sub(1)
    }

    pub fn output_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .skip(1)
            .map(|c| format!("{}={}", self.column, c))
            .collect()
    }

    /// Write the dummy coding of `value` into `out` (length `n_outputs`).
    ///
    /// Unseen values fail when `strict`, otherwise they encode as all zeros.
    pub fn encode_into(&self, value: &str, out: &mut [f64], strict: bool) -> Result<Encoded> {
        out.iter_mut().for_each(|v| *v = 0.0);
        match self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(0) => Ok(Encoded::Known),
            Ok(pos) => {
                out[pos - 1] = 1.0;
                Ok(Encoded::Known)
            }
            Err(_) if strict => Err(BurnwiseError::UnseenCategory {
                column: self.column.clone(),
                value: value.to_string(),
            }),
            Err(_) => Ok(Encoded::Unknown),
        }
    }
}
