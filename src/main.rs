// Clinguard - Clinical Data Access Compliance Guard
// Copyright (c) 2025 Clinguard Contributors
// Licensed under the MIT License

use clinguard::cli::{Cli, Commands};
use clinguard::config::{load_config, ApplicationConfig, LoggingConfig};
use clinguard::logging::init_logging;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging is set up before the command validates the file, so an
    // unreadable config only falls back to console defaults here
    let (application, logging_config) = match load_config(&cli.config) {
        Ok(config) => (config.application, config.logging),
        Err(_) => (ApplicationConfig::default(), LoggingConfig::default()),
    };
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(application.log_level.as_str());

    let logging_guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Clinguard - Clinical Data Access Compliance Guard"
    );

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e:#}");
            5
        }
    };

    // process::exit skips destructors, so flush file logs first
    drop(logging_guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Evaluate(args) => args.execute(&cli.config).await,
        Commands::Report(args) => args.execute(&cli.config).await,
        Commands::Deidentify(args) => args.execute(&cli.config).await,
        Commands::Noise(args) => args.execute(&cli.config).await,
        Commands::Migrate(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
