pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "leadline",
    about = "Leadline operator CLI",
    long_about = "Operate Leadline runtime readiness, migrations, demo fixtures, config inspection, and CSV export.",
    after_help = "Examples:\n  leadline doctor --json\n  leadline config\n  leadline export --status sent"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the deterministic demo dataset")]
    Seed,
    #[command(about = "Write the lead book as BOM-prefixed UTF-8 CSV")]
    Export {
        #[arg(long, help = "Destination path; stdout when omitted")]
        output: Option<std::path::PathBuf>,
        #[arg(long, help = "Only leads in this lifecycle state (new, sent, converted, returned)")]
        status: Option<String>,
        #[arg(long, help = "Only leads in this category")]
        category: Option<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, notifier readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Export { output, status, category } => {
            commands::export::run(output.as_deref(), status.as_deref(), category.as_deref())
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    // `export` without --output writes CSV to stdout itself and leaves the
    // envelope empty.
    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
