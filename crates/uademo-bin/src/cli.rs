// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Start the demo server (default)
//! - `validate`: Validate a configuration file
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// uademo - OPC UA demo server
///
/// Serves a demo namespace of random and mass-generated variables and drives
/// monitored items through either periodic sampling or change notification.
#[derive(Parser, Debug)]
#[command(
    name = "uademo",
    author = "Sylvex <contact@sylvex.io>",
    version = uademo_core::VERSION,
    about = "OPC UA demo server with a tick-based sampling engine",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long, env = "UADEMO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact); overrides the config file
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the uademo CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the demo server
    ///
    /// This is the default command when no subcommand is specified.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration without starting the server.
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Disable the simulated writer on the mass nodes
    #[arg(long)]
    pub no_writer: bool,

    /// Stop after this many seconds instead of waiting for a signal
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<uademo_config::LogFormat> for LogFormat {
    fn from(format: uademo_config::LogFormat) -> Self {
        match format {
            uademo_config::LogFormat::Text => LogFormat::Text,
            uademo_config::LogFormat::Json => LogFormat::Json,
            uademo_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Resolves the log level: quiet/verbose flags, then `--log-level`,
    /// then the configured level.
    pub fn effective_log_level<'a>(&'a self, configured: &'a str) -> &'a str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            self.log_level.as_deref().unwrap_or(configured)
        }
    }

    /// Resolves the log format: `--log-format`, then the configured format.
    pub fn effective_log_format(&self, configured: uademo_config::LogFormat) -> LogFormat {
        self.log_format.unwrap_or_else(|| configured.into())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["uademo"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run(_)));
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["uademo", "run", "--no-writer", "--duration-secs", "5"]);
        if let Some(Commands::Run(args)) = cli.command {
            assert!(args.no_writer);
            assert_eq!(args.duration_secs, Some(5));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["uademo", "validate", "--show-config", "-f", "json"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.show_config);
            assert_eq!(args.format, OutputFormat::Json);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["uademo", "-c", "/etc/uademo/uademo.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/uademo/uademo.yaml")));
    }

    #[test]
    fn test_log_level_overrides_config() {
        let cli = Cli::parse_from(["uademo", "-l", "trace"]);
        assert_eq!(cli.effective_log_level("info"), "trace");

        let cli = Cli::parse_from(["uademo"]);
        assert_eq!(cli.effective_log_level("error"), "error");
    }

    #[test]
    fn test_quiet_and_verbose() {
        let cli = Cli::parse_from(["uademo", "-q", "-l", "trace"]);
        assert_eq!(cli.effective_log_level("info"), "warn");

        let cli = Cli::parse_from(["uademo", "-v"]);
        assert_eq!(cli.effective_log_level("info"), "debug");
    }

    #[test]
    fn test_log_format() {
        let cli = Cli::parse_from(["uademo", "--log-format", "json"]);
        assert_eq!(
            cli.effective_log_format(uademo_config::LogFormat::Text),
            LogFormat::Json
        );

        let cli = Cli::parse_from(["uademo"]);
        assert_eq!(
            cli.effective_log_format(uademo_config::LogFormat::Compact),
            LogFormat::Compact
        );
    }
}
