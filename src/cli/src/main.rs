//! Vetter CLI - offline schema auditing and record validation.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{audit, check};
use output::OutputFormat;

/// Vetter - entity schema validation toolkit
#[derive(Parser)]
#[command(
    name = "vetter",
    version,
    about = "Vetter - entity schema validation toolkit",
    long_about = "Audit exported entity schema declarations and validate records against them.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit exported schema declarations for defects
    Audit(audit::AuditArgs),

    /// Validate a record against an exported schema
    Check(check::CheckArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let format = cli.output;
    let result = match cli.command {
        Commands::Audit(args) => audit::execute(args, format),
        Commands::Check(args) => check::execute(args, format),
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
