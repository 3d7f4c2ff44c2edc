//! Command-line interface module.
//!
//! This module defines the CLI structure using Clap, including
//! all commands, arguments, and options.
//!
//! # Commands
//!
//! - `generate`: Build the variable document for every catalog module
//! - `graph`: Export the module dependency graph of a generated document
//! - `parse-type`: Print the canonical form of a type constraint
//! - `init`: Create an example configuration file
//! - `validate`: Validate a configuration file
//!
//! # Example Usage
//!
//! ```bash
//! # Generate with the default file locations
//! varsmith generate
//!
//! # Override inputs and skip broken modules
//! varsmith generate --catalog catalog.json --modules-dir ./modules --continue-on-error
//!
//! # Export the dependency graph
//! varsmith graph avm_data.json --format mermaid --output deps.mmd
//!
//! # Inspect a type constraint
//! varsmith parse-type 'map(object({ name = string, size = optional(number, 3) }))'
//! ```

use crate::types::{FormatterKind, GraphFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Varsmith - Terraform module variable cataloguer.
#[derive(Parser, Debug)]
#[command(
    name = "varsmith",
    author,
    version,
    about = "Terraform module variable cataloguer",
    long_about = "Varsmith reads the variable declarations of a catalog of Terraform modules, \
                  infers realistic defaults from their usage examples, renders a canonical \
                  snippet per variable and orders the modules so that dependencies come first."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "VARSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format
    #[arg(long, global = true, default_value = "text", value_enum)]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the variable document for every catalog module
    #[command(visible_alias = "gen")]
    Generate(GenerateArgs),

    /// Export the dependency graph of a generated document
    #[command(visible_alias = "g")]
    Graph(GraphArgs),

    /// Print the canonical rendering of a type constraint
    ParseType(ParseTypeArgs),

    /// Create an example configuration file
    Init(InitArgs),

    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Arguments for the generate command.
#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Module catalog (JSON)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Directory holding one source tree per module
    #[arg(long, value_name = "DIR")]
    pub modules_dir: Option<PathBuf>,

    /// Provider resource type to module lookup table (JSON)
    #[arg(long, value_name = "FILE")]
    pub provider_table: Option<PathBuf>,

    /// Where the document is written
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of modules processed concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Snippet formatter
    #[arg(long, value_enum)]
    pub formatter: Option<FormatterKind>,

    /// Drop failing modules instead of aborting the run
    #[arg(long)]
    pub continue_on_error: bool,
}

/// Arguments for the graph command.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Generated document (defaults to the configured output)
    #[arg(value_name = "DOCUMENT")]
    pub input: Option<PathBuf>,

    /// Output format for the graph
    #[arg(short, long, default_value = "dot", value_enum)]
    pub format: GraphFormat,

    /// Output file path (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for the parse-type command.
#[derive(Args, Debug)]
pub struct ParseTypeArgs {
    /// Type constraint expression
    #[arg(value_name = "EXPR")]
    pub expr: String,
}

/// Arguments for the init command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the configuration
    #[arg(value_name = "FILE", default_value = "varsmith.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(value_name = "FILE", default_value = "varsmith.yaml")]
    pub file: PathBuf,
}
