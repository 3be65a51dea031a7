//! admitml - pipeline entry point

use admitml::cli::{cmd_clean, cmd_select, cmd_train, load_config, Cli, Commands};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admitml=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Clean { input, output } => cmd_clean(&config, &input, &output),
        Commands::Select { data, output } => cmd_select(&config, &data, &output),
        Commands::Train {
            data,
            family,
            coefficients,
            metrics,
        } => cmd_train(&config, &data, &family, &coefficients, metrics.as_deref()),
    }
}
