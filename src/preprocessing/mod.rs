//! Feature preprocessing
//!
//! Numeric predictors are standardized with training-partition mean and
//! sample standard deviation. Categorical predictors are dummy coded against
//! their first sorted level. All parameters are learned from the training
//! partition only and reused unchanged for every later transform.

mod encoder;
mod pipeline;
mod scaler;

pub use encoder::{Encoded, OneHotEncoder};
pub use pipeline::{ColumnTransform, FittedPreprocessor, Preprocessor};
pub use scaler::ScalerParams;
