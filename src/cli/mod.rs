//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Clinguard using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Clinguard - clinical data-access compliance guard
#[derive(Parser, Debug)]
#[command(name = "clinguard")]
#[command(version, about, long_about = None)]
#[command(author = "Clinguard Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "clinguard.toml", env = "CLINGUARD_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CLINGUARD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate data access requests and print the decisions
    Evaluate(commands::evaluate::EvaluateArgs),

    /// Generate a compliance report from the audit ledger
    Report(commands::report::ReportArgs),

    /// De-identify result rows
    Deidentify(commands::deidentify::DeidentifyArgs),

    /// Add differential-privacy noise to numeric results
    Noise(commands::noise::NoiseArgs),

    /// Apply the PostgreSQL schema
    Migrate(commands::migrate::MigrateArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_evaluate() {
        let cli = Cli::parse_from(["clinguard", "evaluate", "--request", "req.json"]);
        assert_eq!(cli.config, "clinguard.toml");
        match cli.command {
            Commands::Evaluate(args) => assert_eq!(args.request, "req.json"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["clinguard", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["clinguard", "--log-level", "debug", "migrate"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Migrate(_)));
    }

    #[test]
    fn test_cli_parse_report_dates() {
        let cli = Cli::parse_from([
            "clinguard",
            "report",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
        ]);
        match cli.command {
            Commands::Report(args) => {
                assert_eq!(args.start.to_string(), "2024-01-01");
                assert_eq!(args.end.to_string(), "2024-01-31");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_report_date() {
        let result = Cli::try_parse_from([
            "clinguard",
            "report",
            "--start",
            "January",
            "--end",
            "2024-01-31",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_noise_epsilon() {
        let cli = Cli::parse_from(["clinguard", "noise", "--input", "v.json", "--epsilon", "0.5"]);
        match cli.command {
            Commands::Noise(args) => assert_eq!(args.epsilon, Some(0.5)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_deidentify_level() {
        let cli = Cli::parse_from([
            "clinguard",
            "deidentify",
            "--input",
            "rows.json",
            "--level",
            "expert-determination",
        ]);
        assert!(matches!(cli.command, Commands::Deidentify(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["clinguard", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
