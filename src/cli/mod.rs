//! Burnwise CLI Module
//!
//! Command-line interface for training the calorie models and inspecting data.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::data::{DataLoader, FeatureSelector, FeatureSpec};
use crate::pipeline::Pipeline;
use crate::report::PipelineReport;
use crate::training::ModelFamily;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "burnwise")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Calories-burned regression over gym session data")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train and compare every model family on a session table
    Train {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Field delimiter of the input file
        #[arg(long, default_value_t = ',')]
        delimiter: char,

        /// JSON configuration file; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run seed
        #[arg(long)]
        seed: Option<u64>,

        /// Number of cross-validation folds
        #[arg(long)]
        folds: Option<usize>,

        /// Fraction of rows used for training
        #[arg(long)]
        split: Option<f64>,

        /// Stratify the split by target decile
        #[arg(long)]
        stratify: bool,

        /// Encode categories unseen during fit as all zeros instead of failing
        #[arg(long)]
        lenient_categories: bool,

        /// Model families to train (ols, ridge, lasso, elasticnet, gbt)
        #[arg(short, long, value_delimiter = ',')]
        models: Vec<String>,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show data information and check the configured columns
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Field delimiter of the input file
        #[arg(long, default_value_t = ',')]
        delimiter: char,

        /// JSON configuration file naming target and predictors
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the default configuration as JSON
    Config {
        /// Output file
        #[arg(short, long, default_value = "burnwise.json")]
        output: PathBuf,
    },
}

/// Overrides collected from `train` flags
#[derive(Debug, Default)]
pub struct TrainOverrides {
    pub seed: Option<u64>,
    pub folds: Option<usize>,
    pub split: Option<f64>,
    pub stratify: bool,
    pub lenient_categories: bool,
    pub models: Vec<String>,
}

impl TrainOverrides {
    /// Apply flags on top of `config`
    pub fn apply(&self, mut config: PipelineConfig) -> anyhow::Result<PipelineConfig> {
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(folds) = self.folds {
            config = config.with_folds(folds);
        }
        if let Some(split) = self.split {
            config = config.with_train_fraction(split);
        }
        if self.stratify {
            config = config.with_stratify(true);
        }
        if self.lenient_categories {
            config = config.with_strict_categories(false);
        }
        if !self.models.is_empty() {
            let families = self
                .models
                .iter()
                .map(|m| {
                    ModelFamily::parse(m)
                        .ok_or_else(|| anyhow::anyhow!("Unknown model family: {}", m))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            config = config.with_models(&families);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Loader for a single-byte field delimiter
pub fn loader(delimiter: char) -> anyhow::Result<DataLoader> {
    if !delimiter.is_ascii() {
        anyhow::bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
    }
    Ok(DataLoader::new().with_delimiter(delimiter as u8))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(p) => Ok(PipelineConfig::from_json_file(p)?),
        None => Ok(PipelineConfig::default()),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    delimiter: char,
    config_path: Option<&Path>,
    overrides: &TrainOverrides,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Train");

    let config = overrides.apply(load_config(config_path)?)?;

    step_run("Loading data");
    let start = Instant::now();
    let df = loader(delimiter)?.load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let families: Vec<&str> = config.models.iter().map(|m| m.name()).collect();
    step_run(&format!("Training {}", families.join(", ").cyan()));
    let start = Instant::now();
    let run = Pipeline::new(config)?.run(&df)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    print_report(&run.report);

    if let Some(path) = output {
        step_run(&format!("Saving report → {}", path.display()));
        run.report.save(path)?;
        step_done("");
    }

    println!();
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!();
    println!(
        "  {:<12} {} train / {} test",
        muted("Split"),
        report.split.n_train,
        report.split.n_test
    );

    if !report.cross_validation.is_empty() {
        section(&format!("Cross-validation ({} folds)", report.config.cv.n_folds));
        for cv in &report.cross_validation {
            println!(
                "  {:<22} {:<34} {}",
                cv.family.name(),
                cv.selected.to_string(),
                format!("{:.4}", cv.cv_rmse).white()
            );
        }
    }

    section("Test metrics");
    println!(
        "  {:<22} {:>10} {:>10} {:>8}",
        muted("Model"),
        muted("RMSE"),
        muted("MAE"),
        muted("R²")
    );
    for m in &report.metrics {
        let line = format!("{:<22} {:>10.4} {:>10.4} {:>8.4}", m.model, m.rmse, m.mae, m.r2);
        if m.model == report.best_model.model {
            println!("  {}", line.white().bold());
        } else {
            println!("  {}", line);
        }
    }
    println!();
    println!(
        "  {} {} {} {:.4}",
        ok("best"),
        report.best_model.model.white().bold(),
        muted("RMSE:"),
        report.best_model.rmse
    );

    let summary = &report.residuals.summary;
    section("Residuals");
    println!("  {:<16} {:.4}", muted("Mean"), summary.mean);
    println!("  {:<16} {:.4}", muted("Std dev"), summary.std_dev);
    println!(
        "  {:<16} {} beyond ±{:.2}",
        muted("Outliers"),
        summary.outlier_count,
        summary.threshold
    );
    println!("  {:<16} {} ({:.3})", muted("Skew"), summary.skew_shape, summary.skewness);
    println!(
        "  {:<16} {} ({:.3})",
        muted("Tails"),
        summary.tail_shape,
        summary.excess_kurtosis
    );

    if !report.feature_importances.is_empty() {
        section("Feature importance");
        for f in report.feature_importances.iter().take(10) {
            println!("  {:<28} {:.4}", f.feature, f.importance);
        }
    }

    if !report.warnings.is_empty() {
        section("Warnings");
        for w in &report.warnings {
            println!("  {} {}", "!".yellow(), w);
        }
    }
}

pub fn cmd_info(
    data_path: &Path,
    delimiter: char,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Data Info");

    let config = load_config(config_path)?;
    let df = loader(delimiter)?.load_csv(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    println!(
        "  {:<20} {:<12} {:>6} {:>8}",
        muted("Column"),
        muted("Type"),
        muted("Nulls"),
        muted("Unique")
    );
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name().as_str(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    section("Feature check");
    let spec = FeatureSpec::from_config(&config)?;
    match FeatureSelector::new(spec).select(&df) {
        Ok(frame) => {
            println!(
                "  {} target {} with {} predictors over {} rows",
                ok("✓"),
                frame.target_name().white(),
                frame.columns().len(),
                frame.n_rows()
            );
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
        }
    }

    println!();
    Ok(())
}

pub fn cmd_config(output: &Path) -> anyhow::Result<()> {
    PipelineConfig::default().to_json_file(output)?;
    println!("  {} default configuration written to {}", ok("✓"), output.display());
    Ok(())
}
