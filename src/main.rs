//! Varsmith CLI entry point.
//!
//! This binary provides the command-line interface for Varsmith.

use anyhow::Context;
use clap::Parser;
use comfy_table::{ContentArrangement, Table};
use std::error::Error;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use varsmith::cli::{Cli, Commands, LogFormat};
use varsmith::graph::{export_graph, ModuleGraph};
use varsmith::parser::parse_type_expression;
use varsmith::{Config, Document, Generator, VarsmithError};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet, cli.log_format);

    match run(cli) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");

            eprintln!("Error: {e}");

            // anyhow's chain starts with the error itself
            let mut causes = e.chain().skip(1).peekable();
            if causes.peek().is_some() {
                eprintln!("\nCaused by:");
                for (i, cause) in causes.enumerate() {
                    eprintln!("  {i}: {cause}");
                }
            }

            let code = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<VarsmithError>())
                .map_or(1, VarsmithError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_logging(verbose: u8, quiet: bool, format: LogFormat) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let base_level = match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            EnvFilter::new(format!("warn,varsmith={base_level}"))
        })
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config.as_deref();

    match &cli.command {
        Commands::Generate(args) => {
            let mut config = load_config(config_path)?;
            config.merge_cli_args(args);
            config.validate()?;

            let show_progress = !cli.quiet && std::io::stderr().is_terminal();
            let generator = Generator::new(config).with_progress(show_progress);
            let report = generator.run()?;
            generator.write(&report.document)?;

            if !cli.quiet {
                println!("{}", priority_table(&report.document));
                println!(
                    "Wrote {} modules to {}",
                    report.document.modules.len(),
                    generator.config().paths.output.display()
                );
                if !report.failed.is_empty() {
                    println!("Dropped {} modules: {}", report.failed.len(), report.failed.join(", "));
                }
            }

            Ok(ExitCode::from(if report.failed.is_empty() { 0 } else { 2 }))
        }

        Commands::Graph(args) => {
            let input = match &args.input {
                Some(input) => input.clone(),
                None => load_config(config_path)?.paths.output,
            };
            let document = Document::load(&input)?;
            let graph = ModuleGraph::from_document(&document);
            let graph_output = export_graph(&graph, args.format)?;

            if let Some(output_path) = &args.output {
                std::fs::write(output_path, &graph_output)
                    .with_context(|| format!("Failed to write {}", output_path.display()))?;
                tracing::info!(path = %output_path.display(), "Graph written");
            } else {
                println!("{graph_output}");
            }

            Ok(ExitCode::SUCCESS)
        }

        Commands::ParseType(args) => {
            let descriptor = parse_type_expression(&args.expr)?;
            println!("{descriptor}");
            Ok(ExitCode::SUCCESS)
        }

        Commands::Init(args) => {
            if args.output.exists() && !args.force {
                anyhow::bail!("Configuration file already exists: {}", args.output.display());
            }

            std::fs::write(&args.output, Config::example_yaml())
                .with_context(|| format!("Failed to write {}", args.output.display()))?;
            println!("Created example configuration: {}", args.output.display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Validate(args) => {
            let content = std::fs::read_to_string(&args.file)
                .with_context(|| format!("Failed to read {}", args.file.display()))?;
            match Config::from_yaml(&content) {
                Ok(_) => {
                    println!("Configuration is valid: {}", args.file.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("Configuration error: {e}");
                    if let Some(source) = e.source() {
                        eprintln!("  caused by: {source}");
                    }
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(config_path) = explicit {
        tracing::debug!(path = %config_path.display(), "Loading configuration from explicit path");
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        return Ok(Config::from_yaml(&content)?);
    }

    let default_paths = ["varsmith.yaml", "varsmith.yml", ".varsmith.yaml"];
    tracing::debug!("Searching for default configuration files");
    for path in &default_paths {
        if Path::new(path).exists() {
            tracing::debug!(path = %path, "Found configuration file");
            let content = std::fs::read_to_string(path)?;
            return Ok(Config::from_yaml(&content)?);
        }
    }

    tracing::debug!("No configuration file found, using default configuration");
    Ok(Config::default())
}

fn priority_table(document: &Document) -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Priority", "Module", "Variables", "Depends on"]);

    for entry in document.in_priority_order() {
        let deps: Vec<&str> = entry.depends_on.avm_depends_on.iter().map(String::as_str).collect();
        table.add_row(vec![
            entry.priority.to_string(),
            entry.info.module_name.clone(),
            entry.variables.len().to_string(),
            deps.join(", "),
        ]);
    }
    table
}
