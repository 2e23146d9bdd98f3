//! NESTML front end
//!
//! Symbol tables, unit-aware type checking and context conditions for
//! NESTML neuron models.

mod cocos;
mod diagnostics;
mod frontend;
mod types;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use diagnostics::Severity;
use frontend::pipeline::{CheckReport, Frontend, FrontendConfig};
use frontend::symbol_table::predefined_function_names;
use types::CompilationContext;

/// NESTML front end
#[derive(Parser, Debug)]
#[command(name = "nestmlc")]
#[command(version = "0.1.0")]
#[command(about = "NESTML front end - checks neuron models for symbol, type and unit errors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print diagnostics as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Also report INFO diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Lowest severity that is printed
    #[arg(long, value_enum, default_value = "info", global = true)]
    min_severity: SeverityArg,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check model files for errors
    Check {
        /// Model files (.nestml)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the scope tree of each neuron in a model file
    Symbols {
        /// Model file
        file: PathBuf,
    },
    /// List the predefined units and functions
    Units,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeverityArg {
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let config = FrontendConfig {
        emit_info: cli.verbose,
        min_severity: cli.min_severity.into(),
    };

    let outcome = match &cli.command {
        Commands::Check { files } => check_files(files, config, cli.json),
        Commands::Symbols { file } => dump_symbols(file, config),
        Commands::Units => {
            list_builtins();
            Ok(true)
        }
        Commands::Version => {
            println!("nestmlc 0.1.0");
            println!("NESTML front end");
            Ok(true)
        }
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

fn read_model(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
}

/// Returns `false` when any neuron has errors
fn check_files(files: &[PathBuf], config: FrontendConfig, json: bool) -> Result<bool> {
    let mut frontend = Frontend::new(config);
    let mut reports: Vec<CheckReport> = Vec::with_capacity(files.len());
    for path in files {
        let source = read_model(path)?;
        let name = path.display().to_string();
        reports.push(frontend.check_source(&source, Some(&name)));
    }

    if json {
        let out = serde_json::to_string_pretty(&reports).context("failed to serialise diagnostics")?;
        println!("{}", out);
    } else {
        for report in &reports {
            print_report(report);
        }
    }
    Ok(!reports.iter().any(CheckReport::has_errors))
}

fn print_report(report: &CheckReport) {
    if let Some(file) = &report.file {
        println!("{}", file);
    }
    for diagnostic in &report.diagnostics {
        println!("  {}", diagnostic);
    }
    for neuron in &report.neurons {
        let status = if neuron.generatable { "ok" } else { "FAILED" };
        println!(
            "  [{}] neuron '{}': {} error(s), {} warning(s)",
            status, neuron.name, neuron.errors, neuron.warnings
        );
    }
}

fn dump_symbols(path: &Path, config: FrontendConfig) -> Result<bool> {
    let source = read_model(path)?;
    let name = path.display().to_string();
    let mut frontend = Frontend::new(config);
    let neurons = frontend.analyse_source(&source, Some(&name));

    for diagnostic in frontend.diagnostics().entries() {
        eprintln!("{}", diagnostic);
    }
    for checked in &neurons {
        println!("neuron {}", checked.neuron.name);
        print!("{}", checked.table.dump());
    }
    Ok(frontend.diagnostics().count(Severity::Error) == 0)
}

fn list_builtins() {
    let ctx = CompilationContext::new();
    println!("Units:");
    for unit in ctx.units().iter() {
        println!("  {:<8} 10^{}", unit.name(), unit.scale());
    }
    println!("Functions:");
    for name in predefined_function_names() {
        println!("  {}", name);
    }
}
