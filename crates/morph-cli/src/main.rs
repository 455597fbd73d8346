//! CodeMorph CLI - Main entry point

use clap::Parser;
use morph_cli::{Cli, Commands, Config};
use morph_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Variables from .env must be visible before clap reads env fallbacks
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Verbose mode logs debug and above; otherwise only warnings reach stderr
    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("morph".to_string())
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // Initialize logging (ignore errors as CLI should work without logging)
    let _guard = init_logging(&log_config);

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> morph_cli::Result<()> {
    let config = Config::from_env()?.with_overrides(&cli.global)?;

    match &cli.command {
        Commands::Scan { source, format } => {
            morph_cli::commands::scan::run(&config, source, *format).await
        },
        Commands::Migrate(args) => morph_cli::commands::migrate::run(&config, args).await,
        Commands::Show { source, path } => {
            morph_cli::commands::show::run(&config, source, path).await
        },
    }
}
