//! Test-set evaluation and residual diagnostics

mod metrics;
mod residuals;

pub use metrics::{rmse, select_best, Evaluator, MetricsRecord, ModelEvaluation, RegressionMetrics};
pub use residuals::{
    ResidualAnalysis, ResidualAnalyzer, ResidualRecord, ResidualSummary, SkewShape, TailShape,
};
