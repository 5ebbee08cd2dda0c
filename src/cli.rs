//! CLI argument definitions using clap with subcommand architecture
//!
//! This module defines the command-line interface for uplift-engine. Each
//! subcommand exposes one slice of the pipeline: `migrate` runs the whole
//! thing, `units` and `routes` stop after their respective analysis stages.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// AngularJS to Angular migration engine
#[derive(Parser, Debug)]
#[command(name = "uplift-engine")]
#[command(about = "Static analysis engine that migrates AngularJS codebases to Angular")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show a progress spinner during long operations
    #[arg(long, global = true)]
    pub progress: bool,
}

// ============================================
// Main Commands Enum
// ============================================

/// Available subcommands for uplift-engine
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full migration pipeline and emit a review session
    #[command(visible_alias = "m")]
    Migrate(MigrateArgs),

    /// Detect AngularJS units without transforming them
    #[command(visible_alias = "u")]
    Units(UnitsArgs),

    /// Extract and transform route definitions only
    #[command(visible_alias = "r")]
    Routes(RoutesArgs),
}

// ============================================
// Migrate Subcommand
// ============================================

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Path to the AngularJS project root
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Scope-mutation count that tips a controller into RISKY
    #[arg(long, value_name = "N")]
    pub threshold: Option<usize>,

    /// Engine config file (defaults to ./uplift.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Print the risk summary line only (no per-unit details)
    #[arg(long)]
    pub summary_only: bool,
}

// ============================================
// Units Subcommand
// ============================================

/// Arguments for the units command
#[derive(Args, Debug)]
pub struct UnitsArgs {
    /// Path to the AngularJS project root
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Only show units of this kind (controller, service, factory, ...)
    #[arg(short, long, value_name = "KIND")]
    pub kind: Option<String>,
}

impl UnitsArgs {
    /// Check whether a detected unit passes the `--kind` filter
    pub fn matches_kind(&self, kind: &str) -> bool {
        match &self.kind {
            Some(wanted) => wanted.eq_ignore_ascii_case(kind),
            None => true,
        }
    }
}

// ============================================
// Routes Subcommand
// ============================================

/// Arguments for the routes command
#[derive(Args, Debug)]
pub struct RoutesArgs {
    /// Path to the AngularJS project root
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Engine config file (defaults to ./uplift.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Include generated resolver and guard stub sources
    #[arg(long)]
    pub stubs: bool,
}

// ============================================
// Output Format
// ============================================

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with visual formatting (default for terminal)
    #[default]
    #[value(alias = "pretty")]
    Text,
    /// JSON - standard JSON output for machine parsing
    Json,
    /// Markdown report suitable for review checklists
    Markdown,
}

// ============================================
// Helper Implementations
// ============================================

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_args_parse() {
        let cli = Cli::try_parse_from([
            "uplift-engine",
            "migrate",
            "app/",
            "--threshold",
            "4",
            "--summary-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Migrate(args) => {
                assert_eq!(args.path, PathBuf::from("app/"));
                assert_eq!(args.threshold, Some(4));
                assert!(args.summary_only);
                assert!(args.out.is_none());
            }
            other => panic!("expected migrate, got {:?}", other),
        }
    }

    #[test]
    fn test_format_alias_and_default() {
        let cli = Cli::try_parse_from(["uplift-engine", "units", "app/"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);

        let cli =
            Cli::try_parse_from(["uplift-engine", "units", "app/", "--format", "pretty"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);

        let cli = Cli::try_parse_from(["uplift-engine", "m", "app/", "-f", "markdown"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_kind_filter_case_insensitive() {
        let cli = Cli::try_parse_from([
            "uplift-engine",
            "units",
            "app/",
            "--kind",
            "Controller",
        ])
        .unwrap();
        match cli.command {
            Commands::Units(args) => {
                assert!(args.matches_kind("controller"));
                assert!(!args.matches_kind("service"));
            }
            other => panic!("expected units, got {:?}", other),
        }
    }

    #[test]
    fn test_routes_alias() {
        let cli = Cli::try_parse_from(["uplift-engine", "r", "app/", "--stubs"]).unwrap();
        match cli.command {
            Commands::Routes(args) => assert!(args.stubs),
            other => panic!("expected routes, got {:?}", other),
        }
    }
}
