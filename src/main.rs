//! yamlpp CLI - YAML include/substitution preprocessor

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use yamlpp::{check, run, FixSuggestion, Report};

#[derive(Parser)]
#[command(name = "yamlpp")]
#[command(about = "yamlpp - resolve !include directives and ${var} placeholders across a YAML tree")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress the summary line (failures are still printed)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every document under INPUT_DIR into a regenerated OUTPUT_DIR
    Process {
        /// Input directory containing source YAML documents
        input_dir: PathBuf,

        /// Output directory (wiped and recreated on every run)
        output_dir: PathBuf,
    },

    /// Resolve every document without writing anything (dry run)
    Check {
        /// Input directory containing source YAML documents
        input_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Process { input_dir, output_dir } => run(input_dir, output_dir),
        Commands::Check { input_dir } => check(input_dir),
    };

    match result {
        Ok(report) => {
            print_report(&report, cli.quiet);
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.fix_suggestion() {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            ExitCode::FAILURE
        }
    }
}

fn print_report(report: &Report, quiet: bool) {
    for failure in &report.failures {
        eprintln!(
            "{} {}: {}",
            "✗".red(),
            failure.path.display().to_string().bold(),
            failure.error
        );
        if let Some(suggestion) = failure.error.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
    }

    if quiet {
        return;
    }
    let failed = report.failed();
    if report.is_success() {
        println!(
            "{} {} documents processed, {} copied through",
            "✓".green(),
            report.processed,
            report.copied
        );
    } else {
        println!(
            "{} {} of {} documents failed ({} succeeded, {} copied through)",
            "✗".red(),
            failed,
            report.processed,
            report.succeeded,
            report.copied
        );
    }
}
