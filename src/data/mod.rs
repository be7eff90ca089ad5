//! Dataset handling: feature selection, typed model frames, partitioning
//!
//! The raw table arrives as a polars [`DataFrame`](polars::prelude::DataFrame).
//! [`FeatureSelector`] projects it onto the target and predictor columns and
//! produces an immutable [`ModelFrame`]; every later stage works on frames.

mod frame;
mod loader;
mod selector;
pub mod split;

pub use frame::{ColumnValues, FeatureColumn, ModelFrame};
pub use loader::DataLoader;
pub use selector::{FeatureSelector, FeatureSpec};
pub use split::{Partitioner, Split};
