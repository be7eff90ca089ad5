//! Burnwise - Main Entry Point

use burnwise::cli::{cmd_config, cmd_info, cmd_train, Cli, Commands, TrainOverrides};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "burnwise=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            delimiter,
            config,
            seed,
            folds,
            split,
            stratify,
            lenient_categories,
            models,
            output,
        } => {
            let overrides = TrainOverrides {
                seed,
                folds,
                split,
                stratify,
                lenient_categories,
                models,
            };
            cmd_train(&data, delimiter, config.as_deref(), &overrides, output.as_deref())?;
        }
        Commands::Info {
            data,
            delimiter,
            config,
        } => {
            cmd_info(&data, delimiter, config.as_deref())?;
        }
        Commands::Config { output } => {
            cmd_config(&output)?;
        }
    }

    Ok(())
}
